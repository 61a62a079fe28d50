//! The `results` command: list previously saved query results.

use anyhow::Result;
use clap::Args;
use prettytable::{row, Table};
use std::path::PathBuf;

use crate::results::ResultsManager;

#[derive(Debug, Args)]
pub struct ResultsArgs {
    /// Directory holding persisted results.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,
}

pub fn run(args: &ResultsArgs) -> Result<()> {
    let manager = ResultsManager::new(&args.results_dir)?;
    let listing = manager.list()?;

    if listing.is_empty() {
        println!("No saved results in {}", args.results_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_titles(row!["file", "when", "data file", "dimension", "top", "filter", "rows"]);
    for summary in listing {
        table.add_row(row![
            summary.filename,
            summary.timestamp,
            summary.data_file,
            summary.dimension,
            summary.top_k,
            summary.alert_type.as_deref().unwrap_or("-"),
            summary.result_count
        ]);
    }
    println!("{table}");

    Ok(())
}
