//! Operator building blocks for the streaming runtime.
//!
//! The runtime executes operators inside its own parallel instances; from
//! this crate's point of view each instance is an independent,
//! single-threaded unit. Operators receive [`Event`]s and emit zero or more
//! output [`Event`]s.

use arrow_array::RecordBatch;
use thiserror::Error;

pub mod side_join;

/// A single logical record flowing through the operator graph.
///
/// The payload is an Arrow [`RecordBatch`] carrying one row; batching above
/// the single-record granularity is the runtime's concern, not the
/// operator's.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event timestamp in microseconds.
    pub timestamp: i64,
    /// The record payload.
    pub data: RecordBatch,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(timestamp: i64, data: RecordBatch) -> Self {
        Self { timestamp, data }
    }
}

/// Errors raised by operator construction and initialization.
///
/// Steady-state processing does not produce errors: a failed key extraction
/// or a missing dimension row is a defined outcome (no match), not a
/// failure.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Invalid operator configuration.
    #[error("operator config error: {0}")]
    ConfigError(String),

    /// The dimension dataset could not be loaded at initialization.
    ///
    /// Fatal to the owning operator instance; no partial state is served.
    #[error("snapshot load failed: {0}")]
    SnapshotFailed(String),

    /// A schema did not match what the operator requires.
    #[error("schema error: {0}")]
    SchemaError(String),
}
