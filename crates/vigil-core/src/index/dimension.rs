//! Single-dimension entity index with score-ordered buckets.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::index::entity::EntityHealthState;
use crate::tracker::AlertState;

/// Selects the entity identifier an alert contributes to, for one dimension.
///
/// A closed enum of field selectors rather than arbitrary callables, so
/// dimension registration stays statically analyzable and serializable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionExtractor {
    /// Select the value of a named tag (e.g. `host`, `dc`).
    Tag(String),
    /// Select the alert type itself, grouping entities by alert kind.
    AlertType,
}

impl DimensionExtractor {
    /// Convenience constructor for tag-based dimensions.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    /// Extracts the entity id for this dimension, or `None` when the alert
    /// does not contribute to it. Empty values count as absent.
    #[must_use]
    pub fn extract<'a>(&self, alert: &'a AlertState) -> Option<&'a str> {
        let value = match self {
            Self::Tag(name) => alert.tags.get(name).map(String::as_str),
            Self::AlertType => Some(alert.alert_type.as_str()),
        };
        value.filter(|v| !v.is_empty())
    }
}

/// Per-dimension index: entity accumulators plus a score-ordered multimap.
///
/// `buckets` maps score (milliseconds) to the set of entities currently at
/// that score; iterating it in reverse yields entities in non-increasing
/// score order. Every entity occupies exactly one bucket at all times —
/// entities enter the zero bucket at creation, so a full enumeration sees
/// every entity ever opened for the dimension.
///
/// Complexity: reposition O(log B) for B distinct scores present, top-k
/// O(k + buckets scanned).
#[derive(Debug)]
pub struct DimensionIndex {
    name: String,
    extractor: DimensionExtractor,
    entity_states: HashMap<String, EntityHealthState>,
    /// Last indexed score per entity; always consistent with `buckets`.
    entity_score: HashMap<String, u64>,
    /// score → entities at that score. No bucket is ever empty.
    buckets: BTreeMap<u64, BTreeSet<String>>,
}

impl DimensionIndex {
    /// Creates an empty index for a dimension.
    #[must_use]
    pub fn new(name: impl Into<String>, extractor: DimensionExtractor) -> Self {
        Self {
            name: name.into(),
            extractor,
            entity_states: HashMap::new(),
            entity_score: HashMap::new(),
            buckets: BTreeMap::new(),
        }
    }

    /// Dimension name (e.g. `host`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field selector for this dimension.
    #[must_use]
    pub fn extractor(&self) -> &DimensionExtractor {
        &self.extractor
    }

    /// Number of distinct entities ever opened for this dimension.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_states.len()
    }

    /// Returns the entity state, if the entity has ever been seen.
    #[must_use]
    pub fn entity_state(&self, entity_id: &str) -> Option<&EntityHealthState> {
        self.entity_states.get(entity_id)
    }

    /// Last indexed score for an entity, in milliseconds.
    #[must_use]
    pub fn score_of(&self, entity_id: &str) -> Option<u64> {
        self.entity_score.get(entity_id).copied()
    }

    /// Returns the state for `entity_id`, creating it at score zero on first
    /// contact. New entities are inserted into the zero bucket immediately.
    pub fn get_or_create(&mut self, entity_id: &str) -> &mut EntityHealthState {
        if !self.entity_states.contains_key(entity_id) {
            self.entity_score.insert(entity_id.to_string(), 0);
            self.buckets.entry(0).or_default().insert(entity_id.to_string());
        }
        self.entity_states.entry(entity_id.to_string()).or_default()
    }

    /// Moves an entity from its `old_score` bucket to the `new_score` bucket.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not sitting in the bucket its recorded score
    /// points at — that would mean the index is internally inconsistent,
    /// which is a programming error, never input-dependent.
    pub fn reposition(&mut self, entity_id: &str, old_score: u64, new_score: u64) {
        if old_score == new_score {
            return;
        }

        let recorded = self.entity_score.get(entity_id);
        assert_eq!(
            recorded,
            Some(&old_score),
            "reposition of {entity_id:?} in {:?}: recorded score {recorded:?} != old {old_score}",
            self.name
        );

        let old_bucket = self
            .buckets
            .get_mut(&old_score)
            .unwrap_or_else(|| panic!("no bucket at score {old_score} for {entity_id:?}"));
        assert!(
            old_bucket.remove(entity_id),
            "entity {entity_id:?} missing from its score bucket {old_score}"
        );
        if old_bucket.is_empty() {
            self.buckets.remove(&old_score);
        }

        self.buckets.entry(new_score).or_default().insert(entity_id.to_string());
        self.entity_score.insert(entity_id.to_string(), new_score);
    }

    /// Walks entities in non-increasing score order, yielding at most `k`.
    ///
    /// Ties within one bucket come out in an unspecified relative order; a
    /// cut in the middle of a tied bucket arbitrarily favors whichever
    /// entities iterate first. Documented non-determinism, not a bug.
    pub fn top_k(&self, k: usize) -> impl Iterator<Item = (&str, &EntityHealthState)> {
        self.buckets
            .iter()
            .rev()
            .flat_map(|(_, entities)| entities.iter())
            .take(k)
            .map(|entity_id| {
                let state = self
                    .entity_states
                    .get(entity_id)
                    .expect("bucketed entity has no state");
                (entity_id.as_str(), state)
            })
    }
}
