//! Per-entity unhealthy-time accumulator.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

/// Health accounting for one entity within one dimension.
///
/// Unhealthy time is the union of alert-active spans, not their sum: the
/// first active alert opens an unhealthy window (`unhealthy_window_start`),
/// further concurrent alerts only join the active set, and the window closes
/// when the last one resolves. This counts overlap once with O(1) extra state
/// per open window — no interval-merge arithmetic on the write path.
///
/// Invariant: `unhealthy_window_start` is `Some` iff `active_alert_ids` is
/// non-empty.
#[derive(Debug, Default, Clone)]
pub struct EntityHealthState {
    /// Alerts currently active on this entity.
    active_alert_ids: HashSet<String>,
    /// Start of the current unhealthy window, while one is open.
    unhealthy_window_start: Option<DateTime<Utc>>,
    /// Total closed unhealthy time, milliseconds. Monotonic non-decreasing.
    cumulative_unhealthy_ms: u64,
    /// Closed unhealthy windows, in chronological order.
    unhealthy_intervals: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    /// Count of alerts seen per alert type, over the entity's lifetime.
    alert_type_counts: HashMap<String, u64>,
}

impl EntityHealthState {
    /// Creates an empty, healthy entity state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alert becoming active on this entity at `at`.
    ///
    /// Opens an unhealthy window when the entity was previously healthy.
    pub fn add_alert(&mut self, alert_id: &str, alert_type: &str, at: DateTime<Utc>) {
        if self.active_alert_ids.is_empty() {
            self.unhealthy_window_start = Some(at);
        }
        self.active_alert_ids.insert(alert_id.to_string());
        *self.alert_type_counts.entry(alert_type.to_string()).or_insert(0) += 1;
    }

    /// Registers an alert resolving on this entity at `at`.
    ///
    /// Closes the unhealthy window when this was the last active alert,
    /// folding the elapsed span into the cumulative total.
    ///
    /// # Panics
    ///
    /// Panics if the closing window would have negative duration. Events are
    /// contractually timestamp-ordered, so a negative span is a programming
    /// error, not recoverable input.
    pub fn remove_alert(&mut self, alert_id: &str, at: DateTime<Utc>) {
        self.active_alert_ids.remove(alert_id);
        if !self.active_alert_ids.is_empty() {
            return;
        }

        let Some(window_start) = self.unhealthy_window_start.take() else {
            return;
        };

        let elapsed_ms = (at - window_start).num_milliseconds();
        assert!(
            elapsed_ms >= 0,
            "unhealthy window closed before it opened: start={window_start}, end={at}"
        );
        #[allow(clippy::cast_sign_loss)]
        {
            self.cumulative_unhealthy_ms += elapsed_ms as u64;
        }
        self.unhealthy_intervals.push((window_start, at));
    }

    /// Whether the entity currently has at least one active alert.
    #[must_use]
    pub fn is_unhealthy(&self) -> bool {
        !self.active_alert_ids.is_empty()
    }

    /// Number of currently-active alerts.
    #[must_use]
    pub fn active_alert_count(&self) -> usize {
        self.active_alert_ids.len()
    }

    /// Cumulative closed unhealthy time in milliseconds. This is the entity's
    /// ranking score.
    #[must_use]
    pub fn score_ms(&self) -> u64 {
        self.cumulative_unhealthy_ms
    }

    /// Cumulative closed unhealthy time in seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_unhealthy_seconds(&self) -> f64 {
        self.cumulative_unhealthy_ms as f64 / 1000.0
    }

    /// Per-alert-type counts over the entity's lifetime.
    #[must_use]
    pub fn alert_type_counts(&self) -> &HashMap<String, u64> {
        &self.alert_type_counts
    }

    /// Closed unhealthy windows, chronological.
    #[must_use]
    pub fn unhealthy_intervals(&self) -> &[(DateTime<Utc>, DateTime<Utc>)] {
        &self.unhealthy_intervals
    }

    /// Unhealthy seconds within `[start, end]`, summing the clipped overlap
    /// of each closed interval with the bounds. `None` bounds are unbounded.
    /// Not on the write path; the currently-open window (if any) is excluded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn unhealthy_time_in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> f64 {
        let mut total_ms: i64 = 0;
        for &(ivl_start, ivl_end) in &self.unhealthy_intervals {
            let clipped_start = match start {
                Some(bound) => ivl_start.max(bound),
                None => ivl_start,
            };
            let clipped_end = match end {
                Some(bound) => ivl_end.min(bound),
                None => ivl_end,
            };
            if clipped_end > clipped_start {
                total_ms += (clipped_end - clipped_start).num_milliseconds();
            }
        }
        total_ms as f64 / 1000.0
    }
}
