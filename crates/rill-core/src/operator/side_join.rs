//! # Side-Table Join Engine
//!
//! Enrich each record of a primary stream with columns from a bounded,
//! externally stored dimension ("side") table.
//!
//! Only the full-cache strategy is implemented here: at initialization the
//! operator loads the *entire* dimension dataset into an in-memory keyed
//! index and serves synchronous lookups against it for every incoming
//! stream record. The load is not coordinated across parallel operator
//! instances — each instance performs its own independent load, an accepted
//! tradeoff for datasets small enough to replicate.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                 FullCacheJoinOperator                  │
//! │                                                        │
//! │  open():   SnapshotSource ──▶ keyed index (all rows)   │
//! │                                                        │
//! │  ┌────────┐   ┌─────────┐   ┌──────────────────────┐   │
//! │  │ Stream │──▶│ Extract │──▶│ Index lookup         │   │
//! │  │ Event  │   │   Key   │   │  hit  → joined rows  │   │
//! │  └────────┘   └─────────┘   │  miss → nulls (LEFT) │   │
//! │                             │         drop  (INNER)│   │
//! │                             └──────────────────────┘   │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! A miss during steady state is never an error; the join kind decides
//! whether the event is dropped (inner) or emitted padded with nulls
//! (left). Output column order follows the out-field list supplied at
//! construction.

use std::sync::Arc;

use arrow_array::{new_null_array, Array, ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use fxhash::FxHashMap;
use tracing::debug;

use super::{Event, OperatorError};

/// A column reference within a join: owning table, name, and data type.
///
/// Shared by reference wherever column lists are passed; never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Name of the owning table.
    pub table: String,
    /// Column name.
    pub field_name: String,
    /// Arrow data type of the column.
    pub data_type: DataType,
}

impl FieldInfo {
    /// Creates a new field reference.
    #[must_use]
    pub fn new(table: impl Into<String>, field_name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            table: table.into(),
            field_name: field_name.into(),
            data_type,
        }
    }
}

/// Kind of side-table join to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideJoinType {
    /// Only emit events whose key matches a dimension row.
    #[default]
    Inner,
    /// Emit every event; unmatched events carry nulls for dimension columns.
    Left,
}

impl SideJoinType {
    /// Returns true if events without a match should still be emitted.
    #[must_use]
    pub fn emits_on_miss(self) -> bool {
        matches!(self, SideJoinType::Left)
    }
}

/// Describes a side-table join clause.
///
/// Produced by the query compiler; consumed only by the join engine.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    /// Name of the stream-side (left) table.
    pub left_table: String,
    /// Name of the dimension-side (right) table.
    pub right_table: String,
    /// Column in the stream whose value is the lookup key.
    pub stream_key_column: String,
    /// Column in the dimension table matched against the stream key.
    pub table_key_column: String,
    /// Inner or left join.
    pub join_type: SideJoinType,
}

/// Counters for side-join activity.
#[derive(Debug, Clone, Default)]
pub struct JoinMetrics {
    /// Events processed.
    pub events_processed: u64,
    /// Output events emitted.
    pub events_emitted: u64,
    /// Events dropped (inner join, no match).
    pub events_dropped: u64,
    /// Lookups that found at least one dimension row.
    pub lookups_matched: u64,
    /// Lookups that found nothing.
    pub lookups_missed: u64,
}

impl JoinMetrics {
    /// Resets all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A side-table join operator behind the connector factory interface.
///
/// Implementations are one-per-parallel-instance and single-threaded; there
/// is no shared state between instances. [`open`](Self::open) must complete
/// before the first [`process`](Self::process) call.
pub trait SideJoinOperator: Send {
    /// Loads the dimension dataset. Called exactly once, before processing.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::SnapshotFailed`] or
    /// [`OperatorError::SchemaError`] if the dataset cannot be indexed;
    /// either is fatal to this operator instance.
    fn open(&mut self, snapshot: Vec<RecordBatch>) -> Result<(), OperatorError>;

    /// Joins one stream event, producing zero or more output events.
    ///
    /// Never fails: a missing key or absent dimension row yields the
    /// no-match behavior dictated by the join kind.
    fn process(&mut self, event: &Event) -> Vec<Event>;

    /// The schema of emitted events.
    fn output_schema(&self) -> SchemaRef;

    /// Join activity counters.
    fn metrics(&self) -> &JoinMetrics;
}

/// Full-cache side-table join operator.
///
/// Constructed via the fixed connector contract
/// `(input_schema, join_info, out_fields, side config)`; the connector layer
/// supplies the snapshot batches to [`open`](SideJoinOperator::open).
pub struct FullCacheJoinOperator {
    join_info: JoinInfo,
    out_fields: Vec<FieldInfo>,
    output_schema: SchemaRef,
    /// Dimension rows indexed by join-key bytes. Duplicate keys keep every
    /// row; each value batch holds exactly one row.
    index: FxHashMap<Vec<u8>, Vec<RecordBatch>>,
    metrics: JoinMetrics,
    opened: bool,
}

impl FullCacheJoinOperator {
    /// Creates the operator. The dimension dataset is not loaded until
    /// [`open`](SideJoinOperator::open).
    ///
    /// # Errors
    ///
    /// Returns [`OperatorError::ConfigError`] if the out-field list is empty
    /// or references a table that is on neither side of the join, and
    /// [`OperatorError::SchemaError`] if a stream-side out-field is absent
    /// from the input schema or declared with a conflicting type.
    pub fn new(
        input_schema: SchemaRef,
        join_info: JoinInfo,
        out_fields: Vec<FieldInfo>,
    ) -> Result<Self, OperatorError> {
        if out_fields.is_empty() {
            return Err(OperatorError::ConfigError(
                "side join requires a non-empty output field list".into(),
            ));
        }
        let output_schema = Self::build_output_schema(&input_schema, &join_info, &out_fields)?;
        Ok(Self {
            join_info,
            out_fields,
            output_schema,
            index: FxHashMap::default(),
            metrics: JoinMetrics::default(),
            opened: false,
        })
    }

    /// Returns the join description.
    #[must_use]
    pub fn join_info(&self) -> &JoinInfo {
        &self.join_info
    }

    /// Number of distinct keys in the loaded index.
    #[must_use]
    pub fn indexed_keys(&self) -> usize {
        self.index.len()
    }

    /// Output order follows `out_fields`; stream columns keep their input
    /// nullability, dimension columns are always nullable (left joins pad
    /// them with nulls).
    ///
    /// Stream-side out-fields must exist in the input schema with their
    /// declared type; anything else is a fatal configuration error here,
    /// before any event flows.
    fn build_output_schema(
        input_schema: &SchemaRef,
        join_info: &JoinInfo,
        out_fields: &[FieldInfo],
    ) -> Result<SchemaRef, OperatorError> {
        let mut fields = Vec::with_capacity(out_fields.len());
        for out in out_fields {
            if out.table == join_info.left_table {
                let input_field = input_schema.field_with_name(&out.field_name).map_err(|_| {
                    OperatorError::SchemaError(format!(
                        "output field '{}.{}' not present in the input schema",
                        out.table, out.field_name
                    ))
                })?;
                if input_field.data_type() != &out.data_type {
                    return Err(OperatorError::SchemaError(format!(
                        "output field '{}.{}' declared as {} but the input schema has {}",
                        out.table,
                        out.field_name,
                        out.data_type,
                        input_field.data_type()
                    )));
                }
                fields.push(Field::new(
                    &out.field_name,
                    out.data_type.clone(),
                    input_field.is_nullable(),
                ));
            } else if out.table == join_info.right_table {
                fields.push(Field::new(&out.field_name, out.data_type.clone(), true));
            } else {
                return Err(OperatorError::ConfigError(format!(
                    "output field '{}.{}' belongs to neither side of the join ({} / {})",
                    out.table, out.field_name, join_info.left_table, join_info.right_table
                )));
            }
        }
        Ok(Arc::new(Schema::new(fields)))
    }

    /// Extracts a key's byte representation from row `row` of `column`.
    ///
    /// Utf8 keys are their bytes; integer keys their little-endian bytes.
    /// Null keys and unsupported types yield `None` (a defined miss).
    fn key_bytes(column: &ArrayRef, row: usize) -> Option<Vec<u8>> {
        if column.is_null(row) {
            return None;
        }
        if let Some(strings) = column.as_any().downcast_ref::<StringArray>() {
            return Some(strings.value(row).as_bytes().to_vec());
        }
        if let Some(ints) = column.as_any().downcast_ref::<Int64Array>() {
            return Some(ints.value(row).to_le_bytes().to_vec());
        }
        if let Some(ints) = column.as_any().downcast_ref::<Int32Array>() {
            return Some(i64::from(ints.value(row)).to_le_bytes().to_vec());
        }
        None
    }

    /// Checks that every dimension-side out-field exists in a snapshot batch
    /// with its declared type. Runs once per batch during
    /// [`open`](SideJoinOperator::open) so that output assembly never fails
    /// afterwards.
    fn validate_snapshot_schema(&self, schema: &SchemaRef) -> Result<(), OperatorError> {
        for out in &self.out_fields {
            if out.table != self.join_info.right_table {
                continue;
            }
            let field = schema.field_with_name(&out.field_name).map_err(|_| {
                OperatorError::SnapshotFailed(format!(
                    "dimension table '{}' snapshot has no column '{}'",
                    self.join_info.right_table, out.field_name
                ))
            })?;
            if field.data_type() != &out.data_type {
                return Err(OperatorError::SchemaError(format!(
                    "dimension column '{}.{}' declared as {} but loaded as {}",
                    self.join_info.right_table,
                    out.field_name,
                    out.data_type,
                    field.data_type()
                )));
            }
        }
        Ok(())
    }

    /// Assembles one output event from a stream event and an optional
    /// matched dimension row.
    ///
    /// Infallible: stream columns are validated against the input schema at
    /// construction and dimension columns against every snapshot batch
    /// during [`open`](SideJoinOperator::open).
    fn emit(&self, event: &Event, side_row: Option<&RecordBatch>) -> Event {
        let num_rows = event.data.num_rows();
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.out_fields.len());
        for out in &self.out_fields {
            if out.table == self.join_info.left_table {
                let column = event
                    .data
                    .column_by_name(&out.field_name)
                    .expect("stream out-fields are validated at construction");
                columns.push(Arc::clone(column));
            } else if let Some(row) = side_row {
                let column = row
                    .column_by_name(&out.field_name)
                    .expect("dimension out-fields are validated during open");
                columns.push(Arc::clone(column));
            } else {
                columns.push(new_null_array(&out.data_type, num_rows));
            }
        }
        let batch = RecordBatch::try_new(Arc::clone(&self.output_schema), columns)
            .expect("validated columns match the output schema");
        Event::new(event.timestamp, batch)
    }
}

impl SideJoinOperator for FullCacheJoinOperator {
    fn open(&mut self, snapshot: Vec<RecordBatch>) -> Result<(), OperatorError> {
        let mut rows = 0usize;
        for batch in &snapshot {
            let schema = batch.schema();
            let key_idx = schema
                .index_of(&self.join_info.table_key_column)
                .map_err(|_| {
                    OperatorError::SnapshotFailed(format!(
                        "dimension table '{}' has no key column '{}'",
                        self.join_info.right_table, self.join_info.table_key_column
                    ))
                })?;
            self.validate_snapshot_schema(&schema)?;
            let key_column = Arc::clone(batch.column(key_idx));
            for row in 0..batch.num_rows() {
                let Some(key) = Self::key_bytes(&key_column, row) else {
                    continue;
                };
                self.index.entry(key).or_default().push(batch.slice(row, 1));
                rows += 1;
            }
        }
        self.opened = true;
        debug!(
            table = %self.join_info.right_table,
            rows,
            keys = self.index.len(),
            "full-cache side table loaded"
        );
        Ok(())
    }

    fn process(&mut self, event: &Event) -> Vec<Event> {
        debug_assert!(self.opened, "process called before open");
        self.metrics.events_processed += 1;

        let key = event
            .data
            .column_by_name(&self.join_info.stream_key_column)
            .filter(|_| event.data.num_rows() > 0)
            .and_then(|col| Self::key_bytes(col, 0));

        let matches = key.as_deref().and_then(|k| self.index.get(k));
        match matches {
            Some(rows) => {
                self.metrics.lookups_matched += 1;
                let mut output = Vec::with_capacity(rows.len());
                for row in rows {
                    output.push(self.emit(event, Some(row)));
                    self.metrics.events_emitted += 1;
                }
                output
            }
            None => {
                self.metrics.lookups_missed += 1;
                if self.join_info.join_type.emits_on_miss() {
                    self.metrics.events_emitted += 1;
                    vec![self.emit(event, None)]
                } else {
                    self.metrics.events_dropped += 1;
                    Vec::new()
                }
            }
        }
    }

    fn output_schema(&self) -> SchemaRef {
        Arc::clone(&self.output_schema)
    }

    fn metrics(&self) -> &JoinMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for FullCacheJoinOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullCacheJoinOperator")
            .field("join_info", &self.join_info)
            .field("indexed_keys", &self.index.len())
            .field("opened", &self.opened)
            .finish_non_exhaustive()
    }
}
