//! Per-alert lifecycle state machine.
//!
//! The tracker owns one [`AlertState`] per currently-open alert. State exists
//! only between the first `NEW`/`ACK` for an `alert_id` and its matching
//! `RSV`; on resolution the state is removed and handed back to the caller.
//! Memory is therefore bounded by the number of concurrently open alerts.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::types::{AlertEvent, LifecycleState};

/// Tracked state of a single open alert.
///
/// `tags` and `alert_type` are snapshotted from the event that opened the
/// alert; later duplicate `NEW`/`ACK` events never update them.
#[derive(Debug, Clone)]
pub struct AlertState {
    /// Identifier of the alert.
    pub alert_id: String,
    /// Type of the alert, taken at creation.
    pub alert_type: String,
    /// Tag snapshot taken at creation.
    pub tags: HashMap<String, String>,
    /// Most recent lifecycle state.
    pub current_state: LifecycleState,
    /// Timestamp of the first `NEW`/`ACK` event.
    pub opened_at: DateTime<Utc>,
    /// Timestamp of the `RSV` event, once resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Ordered history of observed `(timestamp, state)` transitions.
    pub state_history: Vec<(DateTime<Utc>, LifecycleState)>,
}

impl AlertState {
    fn open(event: &AlertEvent) -> Self {
        Self {
            alert_id: event.alert_id.clone(),
            alert_type: event.alert_type.clone(),
            tags: event.tags.clone(),
            current_state: event.state,
            opened_at: event.timestamp,
            resolved_at: None,
            state_history: vec![(event.timestamp, event.state)],
        }
    }

    /// Returns `true` while the alert is open (not resolved).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_state.is_open()
    }

    /// Open-to-resolve duration in seconds, once both ends are known.
    #[must_use]
    pub fn duration_seconds(&self) -> Option<f64> {
        let resolved_at = self.resolved_at?;
        let millis = (resolved_at - self.opened_at).num_milliseconds();
        #[allow(clippy::cast_precision_loss)]
        Some(millis as f64 / 1000.0)
    }
}

/// Outcome of feeding one event through the tracker.
#[derive(Debug)]
pub enum Transition<'a> {
    /// First `NEW`/`ACK` for this alert; state was created. Drives the
    /// per-entity "add alert" path exactly once per alert lifecycle.
    Opened(&'a AlertState),
    /// Duplicate `NEW`/`ACK` for an already-open alert. History was appended;
    /// nothing else changed.
    NoOp,
    /// `RSV` for an open alert; the state was removed and is returned by
    /// value. Drives "remove alert" and the index reposition exactly once.
    Resolved(AlertState),
    /// `RSV` for an alert the tracker has never seen. Dropped without
    /// allocating — documented behavior, not an error.
    Ignored,
}

/// Per-alert state machine: `Unseen → Open → [removed]`.
#[derive(Debug, Default)]
pub struct AlertLifecycleTracker {
    open_alerts: HashMap<String, AlertState>,
}

impl AlertLifecycleTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently-open alerts.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open_alerts.len()
    }

    /// Returns the tracked state for an open alert, if any.
    #[must_use]
    pub fn get(&self, alert_id: &str) -> Option<&AlertState> {
        self.open_alerts.get(alert_id)
    }

    /// Applies one event and reports the lifecycle transition it caused.
    pub fn process(&mut self, event: &AlertEvent) -> Transition<'_> {
        match event.state {
            LifecycleState::New | LifecycleState::Ack => {
                if let Some(state) = self.open_alerts.get_mut(&event.alert_id) {
                    // Idempotent: only the history grows.
                    state.state_history.push((event.timestamp, event.state));
                    state.current_state = event.state;
                    trace!(alert_id = %event.alert_id, state = event.state.as_str(), "duplicate open event");
                    return Transition::NoOp;
                }

                let state = self
                    .open_alerts
                    .entry(event.alert_id.clone())
                    .or_insert_with(|| AlertState::open(event));
                trace!(alert_id = %event.alert_id, alert_type = %state.alert_type, "alert opened");
                Transition::Opened(state)
            }
            LifecycleState::Rsv => {
                let Some(mut state) = self.open_alerts.remove(&event.alert_id) else {
                    trace!(alert_id = %event.alert_id, "orphan resolution dropped");
                    return Transition::Ignored;
                };

                state.state_history.push((event.timestamp, event.state));
                state.current_state = LifecycleState::Rsv;
                state.resolved_at = Some(event.timestamp);
                trace!(alert_id = %event.alert_id, "alert resolved");
                Transition::Resolved(state)
            }
        }
    }
}
