//! The `analyze` command: ingest a file, query, print.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use prettytable::{row, Table};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use vigil_core::pipeline::EventProcessor;
use vigil_core::query::{EntityReport, QueryService};

use crate::results::ResultsManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Path to the alert event file (NDJSON, optionally gzipped).
    pub file: PathBuf,

    /// Dimension to analyze.
    #[arg(short, long, default_value = "host")]
    pub dimension: String,

    /// Number of entities to return.
    #[arg(short = 'k', long, default_value_t = 5)]
    pub top: usize,

    /// Only report entities that carried this alert type.
    #[arg(short = 't', long)]
    pub alert_type: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Persist the results with query metadata.
    #[arg(long)]
    pub save: bool,

    /// Directory for persisted results.
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let mut processor = EventProcessor::with_standard_dimensions();
    let summary = processor
        .process_path(&args.file)
        .with_context(|| format!("failed to process {}", args.file.display()))?;
    eprintln!("Processed {} events from {}", summary.processed, args.file.display());

    let service = QueryService::new(processor.coordinator());
    let reports =
        service.get_top_k_filtered(&args.dimension, args.top, args.alert_type.as_deref())?;

    let rendered = match args.format {
        OutputFormat::Text => render_text(&reports, &args.dimension),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&wire_rows(reports.clone(), &args.dimension))?
        }
    };

    match &args.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if args.save {
        let manager = ResultsManager::new(&args.results_dir)?;
        let path = manager.save(
            wire_rows(reports, &args.dimension),
            &args.file.display().to_string(),
            &args.dimension,
            args.top,
            args.alert_type.as_deref(),
        )?;
        eprintln!("Results saved to {}", path.display());
    }

    Ok(())
}

fn wire_rows(reports: Vec<EntityReport>, dimension: &str) -> Vec<Value> {
    reports.into_iter().map(|r| r.into_wire(dimension)).collect()
}

pub(crate) fn render_text(reports: &[EntityReport], dimension: &str) -> String {
    if reports.is_empty() {
        return "No unhealthy entities found.".to_string();
    }

    let mut table = Table::new();
    table.set_titles(row!["#", dimension, "unhealthy time (s)", "alert types"]);
    for (i, report) in reports.iter().enumerate() {
        let mut types: Vec<_> = report
            .alert_types
            .iter()
            .map(|(ty, count)| format!("{ty} x{count}"))
            .collect();
        types.sort();
        table.add_row(row![
            i + 1,
            report.entity_id,
            format!("{:.1}", report.total_unhealthy_time),
            types.join(", ")
        ]);
    }
    format!("Top Unhealthy Entities ({dimension})\n{table}")
}
