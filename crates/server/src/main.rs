use anyhow::{Context, Result};
use axum::serve;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vigil_core::config::AppConfig;
use vigil_core::index::{DimensionExtractor, IndexCoordinator};
use vigil_core::pipeline::EventProcessor;

mod router;

/// Serves top-k entity health queries over an ingested alert event file.
#[derive(Debug, Parser)]
#[command(name = "vigil-server", version, about)]
struct Args {
    /// Path to the alert event file to ingest (NDJSON, optionally gzipped).
    event_file: PathBuf,

    /// Host to bind to (overrides configuration).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides configuration).
    #[arg(long)]
    port: Option<u16>,
}

/// Initializes the logging system based on the configuration.
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("warn,vigil_core={level},server={level}"))
    });

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_str() == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        // "pretty" and any other format default to pretty logging
        registry.with(tracing_subscriber::fmt::layer().pretty().with_target(false)).init();
    }
}

/// Builds a coordinator with one tag dimension per configured tag.
fn coordinator_from_config(config: &AppConfig) -> IndexCoordinator {
    let mut coordinator = IndexCoordinator::new();
    for tag in &config.dimensions.tags {
        coordinator.register_dimension(tag, DimensionExtractor::tag(tag));
    }
    coordinator
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load().context("configuration validation failed")?;

    init_logging(&config);
    info!("Starting vigil index server");
    debug!(
        dimensions = ?config.dimensions.tags,
        bind_port = config.server.bind_port,
        "Configuration loaded"
    );

    let mut processor = EventProcessor::new(coordinator_from_config(&config));
    let summary = processor
        .process_path(&args.event_file)
        .with_context(|| format!("failed to ingest {}", args.event_file.display()))?;
    info!(processed = summary.processed, skipped = summary.skipped, "Event file ingested");

    let state = router::AppState::new(processor);
    let app = router::create_router(state);

    let host = args.host.unwrap_or_else(|| config.server.bind_address.clone());
    let port = args.port.unwrap_or(config.server.bind_port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    info!(address = %addr, "Query server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown_signal()).await {
        error!(error = %e, "Server error occurred");
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
