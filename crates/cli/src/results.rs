//! Persistence for query results.
//!
//! Each saved run lands in its own `query_results_<timestamp>.json` file
//! alongside a metadata block recording what was asked, so a result can be
//! interpreted long after the source data file is gone.

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const RESULTS_PREFIX: &str = "query_results_";

/// Parameters the query was run with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryParameters {
    pub dimension: String,
    pub top_k: usize,
    pub alert_type: Option<String>,
}

/// Metadata block stored with every saved result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInfo {
    /// When the query ran, RFC 3339.
    pub timestamp: String,
    /// The event file that was analyzed.
    pub data_file: String,
    pub parameters: QueryParameters,
}

/// A saved query: metadata plus the wire-shaped result rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQuery {
    pub query: QueryInfo,
    pub results: Vec<Value>,
}

/// One line in a results listing.
#[derive(Debug, Clone)]
pub struct ResultSummary {
    pub filename: String,
    pub timestamp: String,
    pub data_file: String,
    pub dimension: String,
    pub top_k: usize,
    pub alert_type: Option<String>,
    pub result_count: usize,
}

/// Saves and lists query result files under one directory.
#[derive(Debug)]
pub struct ResultsManager {
    dir: PathBuf,
}

impl ResultsManager {
    /// Opens a manager over `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("cannot create results directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Writes one result file and returns its path.
    pub fn save(
        &self,
        results: Vec<Value>,
        data_file: &str,
        dimension: &str,
        top_k: usize,
        alert_type: Option<&str>,
    ) -> Result<PathBuf> {
        let now = Local::now();
        let saved = SavedQuery {
            query: QueryInfo {
                timestamp: now.to_rfc3339(),
                data_file: data_file.to_string(),
                parameters: QueryParameters {
                    dimension: dimension.to_string(),
                    top_k,
                    alert_type: alert_type.map(str::to_string),
                },
            },
            results,
        };

        let path = self.dir.join(format!("{RESULTS_PREFIX}{}.json", now.format("%Y%m%d_%H%M%S")));
        fs::write(&path, serde_json::to_string_pretty(&saved)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(path)
    }

    /// Loads a saved result file by name (relative to the results directory)
    /// or by absolute path.
    pub fn load(&self, filename: impl AsRef<Path>) -> Result<SavedQuery> {
        let filename = filename.as_ref();
        if filename.is_absolute() {
            Self::read_file(filename)
        } else {
            Self::read_file(&self.dir.join(filename))
        }
    }

    fn read_file(path: &Path) -> Result<SavedQuery> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed result file {}", path.display()))
    }

    /// Summaries of every saved result, newest first. Files that do not parse
    /// are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ResultSummary>> {
        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("cannot read results directory {}", self.dir.display()))?
        {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !filename.starts_with(RESULTS_PREFIX) || !filename.ends_with(".json") {
                continue;
            }

            // entry.path() already includes the results directory; do not
            // route it back through `load`, which would join it again when
            // the directory is a relative path.
            match Self::read_file(&entry.path()) {
                Ok(saved) => summaries.push(ResultSummary {
                    filename,
                    timestamp: saved.query.timestamp,
                    data_file: saved.query.data_file,
                    dimension: saved.query.parameters.dimension,
                    top_k: saved.query.parameters.top_k,
                    alert_type: saved.query.parameters.alert_type,
                    result_count: saved.results.len(),
                }),
                Err(e) => {
                    warn!(file = %filename, error = %e, "skipping unreadable result file");
                }
            }
        }

        summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_results() -> Vec<Value> {
        vec![json!({"host_id": "h1", "total_unhealthy_time": 600.0, "alert_types": {"x": 1}})]
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ResultsManager::new(dir.path()).unwrap();

        let path = manager
            .save(sample_results(), "events.json.gz", "host", 5, Some("disk_full"))
            .unwrap();

        let loaded = manager.load(&path).unwrap();
        assert_eq!(loaded.query.data_file, "events.json.gz");
        assert_eq!(loaded.query.parameters.dimension, "host");
        assert_eq!(loaded.query.parameters.top_k, 5);
        assert_eq!(loaded.query.parameters.alert_type.as_deref(), Some("disk_full"));
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0]["host_id"], "h1");
    }

    #[test]
    fn test_list_reports_saved_queries() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ResultsManager::new(dir.path()).unwrap();
        manager.save(sample_results(), "events.json", "host", 3, None).unwrap();

        let listing = manager.list().unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].dimension, "host");
        assert_eq!(listing[0].top_k, 3);
        assert_eq!(listing[0].result_count, 1);
    }

    #[test]
    fn test_list_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ResultsManager::new(dir.path()).unwrap();
        manager.save(sample_results(), "events.json", "host", 3, None).unwrap();
        std::fs::write(dir.path().join("query_results_bogus.json"), "{not json").unwrap();

        let listing = manager.list().unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn test_list_with_relative_results_dir() {
        // The CLI default is the relative directory "results"; listing must
        // resolve saved files against it exactly once.
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();

        let manager = ResultsManager::new("results").unwrap();
        manager.save(sample_results(), "events.json", "host", 2, None).unwrap();
        let listing = manager.list();

        std::env::set_current_dir(original).unwrap();
        assert_eq!(listing.unwrap().len(), 1, "saved result should be listed");
    }

    #[test]
    fn test_load_by_bare_filename() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ResultsManager::new(dir.path()).unwrap();
        let path = manager.save(sample_results(), "events.json", "host", 2, None).unwrap();

        let name = path.file_name().unwrap();
        let loaded = manager.load(name).unwrap();
        assert_eq!(loaded.query.parameters.top_k, 2);
    }

    #[test]
    fn test_list_ignores_unrelated_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ResultsManager::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        assert!(manager.list().unwrap().is_empty());
    }
}
