//! # Vigil Core
//!
//! Core library for Vigil, an online in-memory health-ranking index over
//! alert lifecycle events.
//!
//! The engine consumes a timestamp-ordered stream of alert events
//! (`NEW`/`ACK`/`RSV`), accounts per-entity "unhealthy time" as the **union**
//! of overlapping alert-active intervals, and answers top-k unhealthiest
//! entity queries per dimension (host, dc, service, volume, or any other
//! tag-derived grouping).
//!
//! - **[`tracker`]**: per-alert lifecycle state machine. Owns transient
//!   [`tracker::AlertState`] records for currently-open alerts only.
//!
//! - **[`index`]**: per-dimension indices. Each [`index::DimensionIndex`]
//!   keeps per-entity accumulators plus a score-ordered bucket structure for
//!   O(log B) repositioning and O(k) top-k enumeration. The
//!   [`index::IndexCoordinator`] fans lifecycle transitions out to every
//!   registered dimension.
//!
//! - **[`pipeline`]**: single-writer event pipeline tying the tracker and the
//!   coordinator together; also drives file ingestion.
//!
//! - **[`query`]**: read-only top-k accessor over a coordinator.
//!
//! - **[`ingest`]**: newline-delimited JSON event files, plain or gzipped.
//!
//! ## Event flow
//!
//! ```text
//! validated AlertEvent
//!       │
//!       ▼
//! AlertLifecycleTracker ── Opened / Resolved ──► IndexCoordinator
//!                                                      │ (per dimension)
//!                                                      ▼
//!                                             EntityHealthState
//!                                                      │ (score changed)
//!                                                      ▼
//!                                             DimensionIndex reposition
//! ```
//!
//! ## Concurrency contract
//!
//! The core contains no interior locking. Ingestion is strictly single-writer:
//! callers must never invoke two mutating operations concurrently. Readers
//! (`QueryService`) may run concurrently with each other but must be
//! serialized against the writer externally — the server crate does this with
//! a reader/writer lock so a query can never observe an index mid-reposition.

pub mod config;
pub mod index;
pub mod ingest;
pub mod pipeline;
pub mod query;
pub mod tracker;
pub mod types;
