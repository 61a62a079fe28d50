//! Read-only top-k queries over a coordinator's indices.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::index::IndexCoordinator;

/// Errors surfaced by the query service.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryError {
    /// Query against a dimension name that was never registered.
    #[error("dimension {0:?} is not registered")]
    UnknownDimension(String),
}

/// One entity in a top-k result, ordered by `total_unhealthy_time` descending.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityReport {
    /// Identifier of the entity within its dimension.
    pub entity_id: String,
    /// Cumulative unhealthy time in seconds (union of alert-active spans).
    pub total_unhealthy_time: f64,
    /// Lifetime count of alerts per alert type.
    pub alert_types: HashMap<String, u64>,
}

impl EntityReport {
    /// Maps the report to the wire shape, keying the identifier as
    /// `<dimension>_id` (e.g. `host_id`).
    #[must_use]
    pub fn into_wire(self, dimension: &str) -> Value {
        json!({
            format!("{dimension}_id"): self.entity_id,
            "total_unhealthy_time": self.total_unhealthy_time,
            "alert_types": self.alert_types,
        })
    }
}

/// Read-only accessor over a coordinator's indices.
///
/// Holds a shared borrow, so it can never mutate index state; callers are
/// responsible for serializing it against the single writer (see the crate
/// docs for the concurrency contract).
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'a> {
    coordinator: &'a IndexCoordinator,
}

impl<'a> QueryService<'a> {
    /// Wraps a coordinator for querying.
    #[must_use]
    pub fn new(coordinator: &'a IndexCoordinator) -> Self {
        Self { coordinator }
    }

    /// Top `k` entities of `dimension` by cumulative unhealthy time,
    /// non-increasing. Returns `min(k, entities ever opened)` entries; ties
    /// within one score come out in an unspecified relative order.
    pub fn get_top_k(&self, dimension: &str, k: usize) -> Result<Vec<EntityReport>, QueryError> {
        self.collect_top_k(dimension, k, None)
    }

    /// Like [`Self::get_top_k`], restricted to entities whose histogram
    /// contains `alert_type`.
    ///
    /// Semantics are rank-then-filter: entities are walked in descending
    /// *total* score order and skipped unless they ever carried an alert of
    /// the requested type. Reported scores remain the unfiltered totals;
    /// scores are not recomputed per type.
    pub fn get_top_k_filtered(
        &self,
        dimension: &str,
        k: usize,
        alert_type: Option<&str>,
    ) -> Result<Vec<EntityReport>, QueryError> {
        self.collect_top_k(dimension, k, alert_type)
    }

    fn collect_top_k(
        &self,
        dimension: &str,
        k: usize,
        alert_type: Option<&str>,
    ) -> Result<Vec<EntityReport>, QueryError> {
        let index = self
            .coordinator
            .index(dimension)
            .ok_or_else(|| QueryError::UnknownDimension(dimension.to_string()))?;

        // Filtering happens after the ordered walk, so pull from the full
        // enumeration and stop once k survivors are collected.
        let walk = index.top_k(if alert_type.is_some() { usize::MAX } else { k });
        let results = walk
            .filter(|(_, state)| {
                alert_type.map_or(true, |ty| state.alert_type_counts().contains_key(ty))
            })
            .take(k)
            .map(|(entity_id, state)| EntityReport {
                entity_id: entity_id.to_string(),
                total_unhealthy_time: state.total_unhealthy_seconds(),
                alert_types: state.alert_type_counts().clone(),
            })
            .collect();
        Ok(results)
    }
}
