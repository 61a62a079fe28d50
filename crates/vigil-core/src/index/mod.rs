//! Per-dimension health indices.
//!
//! A dimension partitions alerts into entities by one attribute (the `host`
//! tag, the `dc` tag, the alert type, ...). Each [`DimensionIndex`] keeps the
//! per-entity accumulators plus a score-ordered bucket structure; the
//! [`IndexCoordinator`] fans alert lifecycle transitions out to every
//! registered dimension.

mod coordinator;
mod dimension;
mod entity;

pub use coordinator::IndexCoordinator;
pub use dimension::{DimensionExtractor, DimensionIndex};
pub use entity::EntityHealthState;
