//! The `query` command: ask a running index server for top-k entities.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use vigil_core::query::EntityReport;

use crate::commands::analyze::{render_text, OutputFormat};
use crate::results::ResultsManager;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Dimension to analyze.
    #[arg(default_value = "host")]
    pub dimension: String,

    /// Base URL of the index server.
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub server: String,

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

pub fn run(args: &QueryArgs) -> Result<()> {
    let rows = fetch(args)?;

    let rendered = match args.format {
        OutputFormat::Text => {
            let reports = rows
                .iter()
                .map(|row| report_from_wire(row, &args.dimension))
                .collect::<Result<Vec<_>>>()?;
            render_text(&reports, &args.dimension)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&rows)?,
    };

    match &args.output {
        Some(path) => fs::write(path, &rendered)
            .with_context(|| format!("cannot write {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if args.save {
        let manager = ResultsManager::new(&args.results_dir)?;
        let path = manager.save(
            rows,
            &args.server,
            &args.dimension,
            args.top,
            args.alert_type.as_deref(),
        )?;
        eprintln!("Results saved to {}", path.display());
    }

    Ok(())
}

fn fetch(args: &QueryArgs) -> Result<Vec<Value>> {
    let url = query_url(&args.server);
    let body = request_body(&args.dimension, args.top, args.alert_type.as_deref());

    let response = reqwest::blocking::Client::new()
        .post(&url)
        .json(&body)
        .send()
        .with_context(|| format!("could not connect to server at {}", args.server))?;

    let status = response.status();
    let payload: Value = response
        .json()
        .with_context(|| format!("malformed response from {url}"))?;

    if !status.is_success() {
        let detail = payload["error"].as_str().unwrap_or("unknown error");
        bail!("server returned {status}: {detail}");
    }

    match payload {
        Value::Array(rows) => Ok(rows),
        other => bail!("expected an array of results, got {other}"),
    }
}

fn query_url(server: &str) -> String {
    format!("{}/query", server.trim_end_matches('/'))
}

fn request_body(dimension: &str, top: usize, alert_type: Option<&str>) -> Value {
    let mut body = json!({ "dimension": dimension, "top": top });
    if let Some(ty) = alert_type {
        body["alert_type"] = Value::String(ty.to_string());
    }
    body
}

/// Rebuilds a report from its wire shape, keyed as `<dimension>_id`.
fn report_from_wire(row: &Value, dimension: &str) -> Result<EntityReport> {
    let id_key = format!("{dimension}_id");
    let entity_id = row[id_key.as_str()]
        .as_str()
        .with_context(|| format!("result row is missing {id_key:?}: {row}"))?
        .to_string();
    let total_unhealthy_time = row["total_unhealthy_time"].as_f64().unwrap_or(0.0);
    let alert_types: HashMap<String, u64> = row["alert_types"]
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(ty, count)| (ty.clone(), count.as_u64().unwrap_or(0)))
                .collect()
        })
        .unwrap_or_default();

    Ok(EntityReport { entity_id, total_unhealthy_time, alert_types })
}
