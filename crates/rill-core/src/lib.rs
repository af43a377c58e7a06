//! # Rill Core
//!
//! Row model and runtime join machinery shared by the Rill crates.
//!
//! This crate provides:
//! - [`operator`] - The event model and the side-table join engine
//! - [`snapshot`] - The snapshot protocol used to populate dimension tables
//!
//! The join engine enriches a primary stream against a bounded external
//! dimension dataset. Only the full-cache strategy lives here: each parallel
//! operator instance loads its own complete copy of the dimension data at
//! startup and serves synchronous lookups from it. Sibling strategies
//! (LRU/async point lookups) are declared by the connector layer but have no
//! engine in this crate.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Event model and side-table join operators.
pub mod operator;

/// Snapshot protocol for loading dimension datasets.
pub mod snapshot;

pub use operator::side_join::{
    FieldInfo, FullCacheJoinOperator, JoinInfo, JoinMetrics, SideJoinOperator, SideJoinType,
};
pub use operator::{Event, OperatorError};
pub use snapshot::{load_full_snapshot, SnapshotSource};
