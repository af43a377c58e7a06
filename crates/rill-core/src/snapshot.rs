//! Snapshot protocol for populating dimension tables.
//!
//! A [`SnapshotSource`] yields a bounded dataset one batch at a time;
//! [`load_full_snapshot`] drains it completely. The full-cache join engine
//! loads through this protocol at operator initialization, so a failed poll
//! is fatal to the owning operator instance: either the whole dataset is
//! indexed or nothing is served.

use arrow_array::RecordBatch;
use async_trait::async_trait;
use tracing::debug;

use crate::operator::OperatorError;

/// A bounded, pollable dataset.
///
/// Implementations are connector-specific (a database scan, a file read, an
/// in-memory fixture). `poll_snapshot` returns `Ok(None)` exactly once, when
/// the dataset is exhausted; callers stop polling at that point.
#[async_trait]
pub trait SnapshotSource: Send {
    /// Returns the next batch of the dataset, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Any error aborts the load; partial data must not be used.
    async fn poll_snapshot(&mut self) -> Result<Option<RecordBatch>, OperatorError>;
}

impl std::fmt::Debug for dyn SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SnapshotSource")
    }
}

/// Drains a [`SnapshotSource`] into memory.
///
/// # Errors
///
/// Propagates the first poll failure; the batches read so far are
/// discarded.
pub async fn load_full_snapshot(
    source: &mut dyn SnapshotSource,
) -> Result<Vec<RecordBatch>, OperatorError> {
    let mut batches = Vec::new();
    let mut rows = 0usize;
    while let Some(batch) = source.poll_snapshot().await? {
        rows += batch.num_rows();
        batches.push(batch);
    }
    debug!(batches = batches.len(), rows, "snapshot load complete");
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow_array::Int64Array;
    use arrow_schema::{DataType, Field, Schema};

    use super::*;

    struct ScriptedSource {
        batches: Vec<Result<RecordBatch, OperatorError>>,
    }

    #[async_trait]
    impl SnapshotSource for ScriptedSource {
        async fn poll_snapshot(&mut self) -> Result<Option<RecordBatch>, OperatorError> {
            if self.batches.is_empty() {
                return Ok(None);
            }
            self.batches.remove(0).map(Some)
        }
    }

    fn int_batch(values: Vec<i64>) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))]).unwrap()
    }

    #[tokio::test]
    async fn test_load_drains_all_batches() {
        let mut source = ScriptedSource {
            batches: vec![Ok(int_batch(vec![1, 2])), Ok(int_batch(vec![3]))],
        };
        let batches = load_full_snapshot(&mut source).await.unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].num_rows() + batches[1].num_rows(), 3);
    }

    #[tokio::test]
    async fn test_load_empty_source() {
        let mut source = ScriptedSource { batches: vec![] };
        let batches = load_full_snapshot(&mut source).await.unwrap();
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn test_poll_error_aborts_load() {
        let mut source = ScriptedSource {
            batches: vec![
                Ok(int_batch(vec![1])),
                Err(OperatorError::SnapshotFailed("connection reset".into())),
            ],
        };
        let err = load_full_snapshot(&mut source).await.unwrap_err();
        assert!(matches!(err, OperatorError::SnapshotFailed(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
