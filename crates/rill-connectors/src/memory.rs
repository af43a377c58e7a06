//! Built-in `memory` connector.
//!
//! Tables of type `memory` are backed by JSON row literals in the `data`
//! property:
//!
//! ```sql
//! CREATE TABLE customers (
//!     id VARCHAR,
//!     name VARCHAR,
//!     PERIOD FOR SYSTEM_TIME
//! ) WITH (
//!     type = 'memory',
//!     data = '[{"id": "c1", "name": "Alice"}]'
//! );
//! ```
//!
//! The connector exists so a pipeline can be compiled and exercised without
//! external systems. It registers for all three roles; the side variant
//! serves its snapshot from the parsed rows.

use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Float64Array, Int32Array, Int64Array, RecordBatch, StringArray,
};
use arrow_schema::DataType;
use async_trait::async_trait;

use rill_core::{OperatorError, SnapshotSource};

use crate::config::ConnectorConfig;
use crate::connector::{DefaultTableParser, SideConnector, TableParser};
use crate::error::ConnectorError;
use crate::registry::ConnectorRegistry;
use crate::table::{CacheMode, SideTableInfo, TableInfo, TableRole};

/// Connector type name.
pub const MEMORY_TYPE: &str = "memory";

/// Registers the memory connector for every role it supports.
pub fn register_memory_connector(registry: &ConnectorRegistry) {
    registry.register_source(
        MEMORY_TYPE,
        Arc::new(|| Arc::new(DefaultTableParser::new(MEMORY_TYPE, TableRole::Source))),
    );
    registry.register_sink(
        MEMORY_TYPE,
        Arc::new(|| Arc::new(DefaultTableParser::new(MEMORY_TYPE, TableRole::Sink))),
    );
    registry.register_side(
        MEMORY_TYPE,
        CacheMode::Full,
        Arc::new(|| Arc::new(MemorySideConnector::new())),
    );
}

/// Side connector serving a dimension table from inline JSON rows.
#[derive(Debug)]
pub struct MemorySideConnector {
    parser: DefaultTableParser,
}

impl MemorySideConnector {
    /// Creates the connector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: DefaultTableParser::new(MEMORY_TYPE, TableRole::Side),
        }
    }
}

impl Default for MemorySideConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl TableParser for MemorySideConnector {
    fn parse_table(
        &self,
        name: &str,
        fields_text: &str,
        config: ConnectorConfig,
    ) -> Result<TableInfo, ConnectorError> {
        // `data` must at least be valid JSON at declaration time.
        if let Some(raw) = config.get("data") {
            serde_json::from_str::<Vec<serde_json::Value>>(raw).map_err(|e| {
                ConnectorError::ConfigurationError(format!(
                    "table '{name}': 'data' is not a JSON array: {e}"
                ))
            })?;
        }
        self.parser.parse_table(name, fields_text, config)
    }
}

#[async_trait]
impl SideConnector for MemorySideConnector {
    async fn open_snapshot(
        &self,
        side: &SideTableInfo,
    ) -> Result<Box<dyn SnapshotSource>, ConnectorError> {
        let raw = side.table().config().get("data").unwrap_or("[]");
        let batch = rows_to_batch(side.table(), raw)?;
        Ok(Box::new(MemorySnapshot { batch }))
    }
}

struct MemorySnapshot {
    batch: Option<RecordBatch>,
}

#[async_trait]
impl SnapshotSource for MemorySnapshot {
    async fn poll_snapshot(&mut self) -> Result<Option<RecordBatch>, OperatorError> {
        Ok(self.batch.take())
    }
}

/// Builds one batch holding every row of the `data` property, shaped by the
/// declared columns. Absent object keys become nulls.
fn rows_to_batch(table: &TableInfo, raw: &str) -> Result<Option<RecordBatch>, ConnectorError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(raw).map_err(|e| {
        ConnectorError::SnapshotFailed(format!(
            "table '{}': 'data' is not a JSON array: {e}",
            table.name()
        ))
    })?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());
    for column in table.columns() {
        let values: Vec<&serde_json::Value> = rows
            .iter()
            .map(|row| row.get(&column.name).unwrap_or(&serde_json::Value::Null))
            .collect();
        columns.push(json_column(table.name(), &column.name, &column.data_type, &values)?);
    }

    RecordBatch::try_new(table.schema(), columns)
        .map(Some)
        .map_err(|e| {
            ConnectorError::SnapshotFailed(format!("table '{}': {e}", table.name()))
        })
}

fn json_column(
    table: &str,
    column: &str,
    data_type: &DataType,
    values: &[&serde_json::Value],
) -> Result<ArrayRef, ConnectorError> {
    let type_error = |row: usize| {
        ConnectorError::SnapshotFailed(format!(
            "table '{table}': row {row} has a value for '{column}' that is not {data_type}"
        ))
    };
    match data_type {
        DataType::Utf8 => {
            let mut out: Vec<Option<&str>> = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match v {
                    serde_json::Value::Null => out.push(None),
                    serde_json::Value::String(s) => out.push(Some(s.as_str())),
                    _ => return Err(type_error(i)),
                }
            }
            Ok(Arc::new(StringArray::from(out)))
        }
        DataType::Int64 => {
            let mut out: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match v {
                    serde_json::Value::Null => out.push(None),
                    _ => out.push(Some(v.as_i64().ok_or_else(|| type_error(i))?)),
                }
            }
            Ok(Arc::new(Int64Array::from(out)))
        }
        DataType::Int32 => {
            let mut out: Vec<Option<i32>> = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match v {
                    serde_json::Value::Null => out.push(None),
                    _ => {
                        let wide = v.as_i64().ok_or_else(|| type_error(i))?;
                        out.push(Some(i32::try_from(wide).map_err(|_| type_error(i))?));
                    }
                }
            }
            Ok(Arc::new(Int32Array::from(out)))
        }
        DataType::Float64 => {
            let mut out: Vec<Option<f64>> = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match v {
                    serde_json::Value::Null => out.push(None),
                    _ => out.push(Some(v.as_f64().ok_or_else(|| type_error(i))?)),
                }
            }
            Ok(Arc::new(Float64Array::from(out)))
        }
        DataType::Boolean => {
            let mut out: Vec<Option<bool>> = Vec::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match v {
                    serde_json::Value::Null => out.push(None),
                    _ => out.push(Some(v.as_bool().ok_or_else(|| type_error(i))?)),
                }
            }
            Ok(Arc::new(BooleanArray::from(out)))
        }
        other => Err(ConnectorError::SchemaError(format!(
            "table '{table}': column '{column}' type {other} is not representable as JSON rows"
        ))),
    }
}
