//! Dimension registry and lifecycle fan-out.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::index::dimension::{DimensionExtractor, DimensionIndex};
use crate::tracker::AlertState;

/// Registry of dimension indices, fanning each alert lifecycle transition
/// out to every registered dimension.
///
/// Constructed explicitly and passed by reference into the ingestion
/// pipeline and the query service — there is no process-wide instance.
/// Dimensions may be registered at any time; a dimension registered after
/// ingestion started only sees alerts processed from then on.
#[derive(Debug, Default)]
pub struct IndexCoordinator {
    dimensions: HashMap<String, DimensionIndex>,
}

impl IndexCoordinator {
    /// Creates a coordinator with no dimensions registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a coordinator with the four conventional dimensions
    /// registered: `host`, `dc`, `service`, and `volume`, each extracting
    /// from the same-named tag.
    #[must_use]
    pub fn standard() -> Self {
        let mut coordinator = Self::new();
        for name in ["host", "dc", "service", "volume"] {
            coordinator.register_dimension(name, DimensionExtractor::tag(name));
        }
        coordinator
    }

    /// Registers a dimension, replacing any previous index under `name`.
    pub fn register_dimension(&mut self, name: impl Into<String>, extractor: DimensionExtractor) {
        let name = name.into();
        debug!(dimension = %name, "registered dimension");
        self.dimensions.insert(name.clone(), DimensionIndex::new(name, extractor));
    }

    /// Returns the index for a dimension, if registered.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&DimensionIndex> {
        self.dimensions.get(name)
    }

    /// Names of all registered dimensions, in no particular order.
    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(String::as_str)
    }

    /// Fans out an alert that just opened: for each dimension the alert
    /// contributes to, lazily create the entity and add the alert to it.
    ///
    /// An alert may contribute to zero, one, or many dimensions depending on
    /// which tags it carries. Opening never moves a score (scores only change
    /// when an unhealthy window closes), so no reposition happens here.
    pub fn on_alert_opened(&mut self, alert: &AlertState, at: DateTime<Utc>) {
        for index in self.dimensions.values_mut() {
            let Some(entity_id) = index.extractor().extract(alert) else {
                continue;
            };
            let entity_id = entity_id.to_string();
            index
                .get_or_create(&entity_id)
                .add_alert(&alert.alert_id, &alert.alert_type, at);
        }
    }

    /// Fans out an alert resolution: remove the alert from each contributing
    /// entity and reposition the entity when its score moved.
    ///
    /// A resolution for an entity this coordinator has never seen opened is
    /// treated as a no-op. Paired `Opened`/`Resolved` transitions make that
    /// unreachable in practice; the guard exists so a dimension registered
    /// mid-stream cannot poison the index.
    pub fn on_alert_resolved(&mut self, alert: &AlertState, at: DateTime<Utc>) {
        for index in self.dimensions.values_mut() {
            let Some(entity_id) = index.extractor().extract(alert) else {
                continue;
            };
            let entity_id = entity_id.to_string();

            let Some(old_score) = index.score_of(&entity_id) else {
                warn!(
                    dimension = index.name(),
                    entity = %entity_id,
                    alert_id = %alert.alert_id,
                    "resolution for entity never seen as opened; ignoring"
                );
                continue;
            };

            let new_score = {
                let entity = index.get_or_create(&entity_id);
                entity.remove_alert(&alert.alert_id, at);
                entity.score_ms()
            };
            index.reposition(&entity_id, old_score, new_score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap as StdHashMap;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn alert(alert_id: &str, alert_type: &str, tags: &[(&str, &str)]) -> AlertState {
        let tags: StdHashMap<String, String> =
            tags.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect();
        AlertState {
            alert_id: alert_id.to_string(),
            alert_type: alert_type.to_string(),
            tags,
            current_state: crate::types::LifecycleState::New,
            opened_at: ts(0),
            resolved_at: None,
            state_history: Vec::new(),
        }
    }

    #[test]
    fn test_standard_dimensions() {
        let coordinator = IndexCoordinator::standard();
        let mut names: Vec<_> = coordinator.dimension_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["dc", "host", "service", "volume"]);
    }

    #[test]
    fn test_fanout_skips_missing_tags() {
        let mut coordinator = IndexCoordinator::standard();
        let a = alert("a1", "disk_full", &[("host", "h1")]);

        coordinator.on_alert_opened(&a, ts(0));

        assert_eq!(coordinator.index("host").unwrap().entity_count(), 1);
        assert_eq!(coordinator.index("dc").unwrap().entity_count(), 0);
        assert_eq!(coordinator.index("service").unwrap().entity_count(), 0);
    }

    #[test]
    fn test_open_resolve_updates_score() {
        let mut coordinator = IndexCoordinator::standard();
        let a = alert("a1", "disk_full", &[("host", "h1"), ("dc", "d1")]);

        coordinator.on_alert_opened(&a, ts(0));
        coordinator.on_alert_resolved(&a, ts(600));

        let host_index = coordinator.index("host").unwrap();
        assert_eq!(host_index.score_of("h1"), Some(600_000));
        let dc_index = coordinator.index("dc").unwrap();
        assert_eq!(dc_index.score_of("d1"), Some(600_000));
    }

    #[test]
    fn test_score_unchanged_while_other_alert_active() {
        let mut coordinator = IndexCoordinator::standard();
        let a = alert("a1", "x", &[("host", "h1")]);
        let b = alert("a2", "y", &[("host", "h1")]);

        coordinator.on_alert_opened(&a, ts(0));
        coordinator.on_alert_opened(&b, ts(5));
        coordinator.on_alert_resolved(&a, ts(10));

        // Window still open via a2, so the indexed score has not moved.
        assert_eq!(coordinator.index("host").unwrap().score_of("h1"), Some(0));

        coordinator.on_alert_resolved(&b, ts(15));
        assert_eq!(coordinator.index("host").unwrap().score_of("h1"), Some(15_000));
    }

    #[test]
    fn test_resolution_for_unseen_entity_is_noop() {
        let mut coordinator = IndexCoordinator::standard();
        let a = alert("a1", "x", &[("host", "h1")]);

        // Never opened through this coordinator.
        coordinator.on_alert_resolved(&a, ts(10));
        assert_eq!(coordinator.index("host").unwrap().entity_count(), 0);
    }

    #[test]
    fn test_dimension_registered_mid_stream() {
        let mut coordinator = IndexCoordinator::standard();
        let a = alert("a1", "x", &[("host", "h1"), ("rack", "r7")]);

        coordinator.on_alert_opened(&a, ts(0));
        coordinator.register_dimension("rack", DimensionExtractor::tag("rack"));
        // The rack dimension missed the open; the resolve must not create
        // phantom state there.
        coordinator.on_alert_resolved(&a, ts(60));

        assert_eq!(coordinator.index("rack").unwrap().entity_count(), 0);
        assert_eq!(coordinator.index("host").unwrap().score_of("h1"), Some(60_000));
    }
}
