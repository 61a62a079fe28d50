//! Alert event type definitions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Observable lifecycle state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Alert has been opened.
    #[serde(rename = "NEW")]
    New,
    /// Alert has been acknowledged by an operator; still open.
    #[serde(rename = "ACK")]
    Ack,
    /// Alert has been resolved.
    #[serde(rename = "RSV")]
    Rsv,
}

impl LifecycleState {
    /// Returns `true` for the states in which the alert is still open.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, Self::New | Self::Ack)
    }

    /// Returns the wire-format name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Ack => "ACK",
            Self::Rsv => "RSV",
        }
    }
}

/// A single validated alert event from the event source.
///
/// Events arrive in timestamp-ascending order, one per lifecycle change of an
/// alert. Schema validation is the upstream parser's job: by the time an
/// `AlertEvent` exists, all fields are well-formed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Identifier of the alert this event belongs to.
    pub alert_id: String,
    /// When the lifecycle change occurred.
    pub timestamp: DateTime<Utc>,
    /// Lifecycle state the alert moved to.
    pub state: LifecycleState,
    /// Type of the alert (e.g. "disk_full", "cpu_high").
    #[serde(rename = "type")]
    pub alert_type: String,
    /// Alert-type-specific fields; dimensions extract entity ids from these.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_state_is_open() {
        assert!(LifecycleState::New.is_open());
        assert!(LifecycleState::Ack.is_open());
        assert!(!LifecycleState::Rsv.is_open());
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{
            "event_id": "e1",
            "alert_id": "a1",
            "timestamp": "2024-05-01T00:00:00Z",
            "state": "NEW",
            "type": "disk_full",
            "tags": {"host": "h1", "dc": "d1"}
        }"#;

        let event: AlertEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_id, "e1");
        assert_eq!(event.alert_id, "a1");
        assert_eq!(event.state, LifecycleState::New);
        assert_eq!(event.alert_type, "disk_full");
        assert_eq!(event.tags.get("host").map(String::as_str), Some("h1"));
    }

    #[test]
    fn test_event_missing_tags_defaults_empty() {
        let json = r#"{
            "event_id": "e1",
            "alert_id": "a1",
            "timestamp": "2024-05-01T00:00:00Z",
            "state": "RSV",
            "type": "disk_full"
        }"#;

        let event: AlertEvent = serde_json::from_str(json).unwrap();
        assert!(event.tags.is_empty());
    }

    #[test]
    fn test_invalid_state_rejected() {
        let json = r#"{
            "event_id": "e1",
            "alert_id": "a1",
            "timestamp": "2024-05-01T00:00:00Z",
            "state": "OPEN",
            "type": "disk_full",
            "tags": {}
        }"#;

        assert!(serde_json::from_str::<AlertEvent>(json).is_err());
    }
}
