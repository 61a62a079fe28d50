//! Single-writer event pipeline.
//!
//! Wires the lifecycle tracker and the index coordinator together: each
//! event is applied as one uninterruptible unit of work, with all three
//! mutation layers (tracker, entity state, index position) updated before
//! the call returns. No operation here suspends or blocks on I/O besides
//! the file-reading entry point.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::index::IndexCoordinator;
use crate::ingest::{EventReader, IngestError};
use crate::tracker::{AlertLifecycleTracker, Transition};
use crate::types::AlertEvent;

/// Summary of one file-ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    /// Events applied to the index.
    pub processed: usize,
    /// Lines skipped because they failed to parse.
    pub skipped: usize,
}

/// Owns the tracker and coordinator and applies events in arrival order.
///
/// Strictly single-writer: callers must not invoke [`Self::process_event`]
/// concurrently. Readers go through [`crate::query::QueryService`] borrowed
/// from [`Self::coordinator`], serialized externally against this writer.
#[derive(Debug)]
pub struct EventProcessor {
    tracker: AlertLifecycleTracker,
    coordinator: IndexCoordinator,
}

impl EventProcessor {
    /// Creates a processor over the given coordinator.
    #[must_use]
    pub fn new(coordinator: IndexCoordinator) -> Self {
        Self { tracker: AlertLifecycleTracker::new(), coordinator }
    }

    /// Creates a processor with the four conventional dimensions registered.
    #[must_use]
    pub fn with_standard_dimensions() -> Self {
        Self::new(IndexCoordinator::standard())
    }

    /// Shared view of the coordinator, for building a query service.
    #[must_use]
    pub fn coordinator(&self) -> &IndexCoordinator {
        &self.coordinator
    }

    /// Mutable access to the coordinator, e.g. to register a dimension
    /// mid-stream. Same single-writer rules as event processing.
    pub fn coordinator_mut(&mut self) -> &mut IndexCoordinator {
        &mut self.coordinator
    }

    /// The lifecycle tracker (open alerts only).
    #[must_use]
    pub fn tracker(&self) -> &AlertLifecycleTracker {
        &self.tracker
    }

    /// Applies one validated event: lifecycle transition, then fan-out to
    /// every registered dimension.
    pub fn process_event(&mut self, event: &AlertEvent) {
        match self.tracker.process(event) {
            Transition::Opened(alert) => {
                self.coordinator.on_alert_opened(alert, event.timestamp);
            }
            Transition::Resolved(alert) => {
                self.coordinator.on_alert_resolved(&alert, event.timestamp);
            }
            Transition::NoOp | Transition::Ignored => {}
        }
    }

    /// Reads and applies every event in a file (plain or gzipped NDJSON).
    ///
    /// Unparseable lines are skipped with a warning and counted; I/O errors
    /// abort. Logs a throughput summary when done.
    pub fn process_path(&mut self, path: impl AsRef<Path>) -> Result<IngestSummary, IngestError> {
        let path = path.as_ref();
        let started = Instant::now();
        let mut summary = IngestSummary { processed: 0, skipped: 0 };

        for result in EventReader::open(path)? {
            match result {
                Ok(event) => {
                    self.process_event(&event);
                    summary.processed += 1;
                }
                Err(IngestError::Parse { line, source }) => {
                    warn!(path = %path.display(), line, error = %source, "skipping invalid event");
                    summary.skipped += 1;
                }
                Err(err @ IngestError::Io(_)) => return Err(err),
            }
        }

        let elapsed = started.elapsed();
        #[allow(clippy::cast_precision_loss)]
        let events_per_sec = summary.processed as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
        info!(
            path = %path.display(),
            processed = summary.processed,
            skipped = summary.skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            events_per_sec = format_args!("{events_per_sec:.0}"),
            "event file processed"
        );

        Ok(summary)
    }
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::with_standard_dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryService;
    use crate::types::LifecycleState;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::io::Write;

    fn event(
        alert_id: &str,
        secs: i64,
        state: LifecycleState,
        alert_type: &str,
        tags: &[(&str, &str)],
    ) -> AlertEvent {
        AlertEvent {
            event_id: format!("ev-{alert_id}-{secs}"),
            alert_id: alert_id.to_string(),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            state,
            alert_type: alert_type.to_string(),
            tags: tags.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    #[test]
    fn test_open_then_resolve_scores_entity() {
        let mut processor = EventProcessor::with_standard_dimensions();

        processor.process_event(&event(
            "a1",
            0,
            LifecycleState::New,
            "disk_full",
            &[("host", "h1")],
        ));
        processor.process_event(&event(
            "a1",
            600,
            LifecycleState::Rsv,
            "disk_full",
            &[("host", "h1")],
        ));

        assert_eq!(processor.tracker().open_count(), 0);
        let service = QueryService::new(processor.coordinator());
        let top = service.get_top_k("host", 1).unwrap();
        assert_eq!(top[0].entity_id, "h1");
        assert!((top[0].total_unhealthy_time - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_ack_changes_nothing() {
        let mut processor = EventProcessor::with_standard_dimensions();

        processor.process_event(&event("a1", 0, LifecycleState::New, "x", &[("host", "h1")]));
        processor.process_event(&event("a1", 10, LifecycleState::Ack, "x", &[("host", "h1")]));
        processor.process_event(&event("a1", 20, LifecycleState::Ack, "x", &[("host", "h1")]));
        processor.process_event(&event("a1", 100, LifecycleState::Rsv, "x", &[("host", "h1")]));

        let service = QueryService::new(processor.coordinator());
        let top = service.get_top_k("host", 1).unwrap();
        assert!((top[0].total_unhealthy_time - 100.0).abs() < f64::EPSILON);
        assert_eq!(top[0].alert_types, HashMap::from([("x".to_string(), 1)]));
    }

    #[test]
    fn test_orphan_rsv_creates_no_state() {
        let mut processor = EventProcessor::with_standard_dimensions();

        processor.process_event(&event("ghost", 0, LifecycleState::Rsv, "x", &[("host", "h1")]));

        assert_eq!(processor.coordinator().index("host").unwrap().entity_count(), 0);
    }

    #[test]
    fn test_process_path_counts_and_skips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"event_id":"e1","alert_id":"a1","timestamp":"2024-05-01T00:00:00Z","state":"NEW","type":"x","tags":{{"host":"h1"}}}}"#
        )
        .unwrap();
        writeln!(file, "this is not json").unwrap();
        writeln!(
            file,
            r#"{{"event_id":"e2","alert_id":"a1","timestamp":"2024-05-01T00:10:00Z","state":"RSV","type":"x","tags":{{"host":"h1"}}}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let mut processor = EventProcessor::with_standard_dimensions();
        let summary = processor.process_path(file.path()).unwrap();

        assert_eq!(summary, IngestSummary { processed: 2, skipped: 1 });
        let service = QueryService::new(processor.coordinator());
        let top = service.get_top_k("host", 1).unwrap();
        assert!((top[0].total_unhealthy_time - 600.0).abs() < f64::EPSILON);
    }
}
