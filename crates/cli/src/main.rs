use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod results;

use commands::{AnalyzeArgs, QueryArgs, ResultsArgs};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Analyze alert event files and rank entities by unhealthy time")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an event file and report the top unhealthy entities
    Analyze(AnalyzeArgs),

    /// Query a running index server for the top unhealthy entities
    Query(QueryArgs),

    /// List previously saved query results
    Results(ResultsArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(&args),
        Commands::Query(args) => commands::query::run(&args),
        Commands::Results(args) => commands::results::run(&args),
    }
}
