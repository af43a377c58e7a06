//! Testing utilities: counting connector doubles and snapshot fixtures.
//!
//! The counting doubles track how many times their factory ran, which is
//! what registry idempotency tests assert on.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow_array::{Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;

use rill_core::{OperatorError, SnapshotSource};

use crate::config::ConnectorConfig;
use crate::connector::{DefaultTableParser, SideConnector, TableParser};
use crate::error::ConnectorError;
use crate::registry::{SideFactory, SourceFactory};
use crate::table::{SideTableInfo, TableInfo, TableRole};

/// Table parser double that delegates to [`DefaultTableParser`].
#[derive(Debug)]
pub struct CountingTableParser {
    parser: DefaultTableParser,
}

impl CountingTableParser {
    /// Returns a factory for this parser plus the shared counter it bumps
    /// on every invocation.
    #[must_use]
    pub fn factory(connector_type: &str, role: TableRole) -> (SourceFactory, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let connector_type = connector_type.to_string();
        let factory: SourceFactory = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingTableParser {
                parser: DefaultTableParser::new(connector_type.clone(), role),
            })
        });
        (factory, count)
    }
}

impl TableParser for CountingTableParser {
    fn parse_table(
        &self,
        name: &str,
        fields_text: &str,
        config: ConnectorConfig,
    ) -> Result<TableInfo, ConnectorError> {
        self.parser.parse_table(name, fields_text, config)
    }
}

/// Side connector double serving a fixed snapshot.
#[derive(Debug)]
pub struct CountingSideConnector {
    parser: DefaultTableParser,
    batches: Vec<RecordBatch>,
}

impl CountingSideConnector {
    /// Returns a factory serving an empty snapshot, plus its invocation
    /// counter.
    #[must_use]
    pub fn factory(connector_type: &str) -> (SideFactory, Arc<AtomicUsize>) {
        Self::factory_with_batches(connector_type, Vec::new())
    }

    /// Returns a factory whose instances serve the given batches, plus its
    /// invocation counter.
    #[must_use]
    pub fn factory_with_batches(
        connector_type: &str,
        batches: Vec<RecordBatch>,
    ) -> (SideFactory, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let connector_type = connector_type.to_string();
        let factory: SideFactory = Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(CountingSideConnector {
                parser: DefaultTableParser::new(connector_type.clone(), TableRole::Side),
                batches: batches.clone(),
            })
        });
        (factory, count)
    }
}

impl TableParser for CountingSideConnector {
    fn parse_table(
        &self,
        name: &str,
        fields_text: &str,
        config: ConnectorConfig,
    ) -> Result<TableInfo, ConnectorError> {
        self.parser.parse_table(name, fields_text, config)
    }
}

#[async_trait]
impl SideConnector for CountingSideConnector {
    async fn open_snapshot(
        &self,
        _side: &SideTableInfo,
    ) -> Result<Box<dyn SnapshotSource>, ConnectorError> {
        Ok(Box::new(FixedSnapshot {
            batches: self.batches.clone(),
        }))
    }
}

/// Snapshot source that replays a fixed batch list.
pub struct FixedSnapshot {
    batches: Vec<RecordBatch>,
}

impl FixedSnapshot {
    /// Creates a snapshot source over the given batches.
    #[must_use]
    pub fn new(batches: Vec<RecordBatch>) -> Self {
        Self { batches }
    }
}

#[async_trait]
impl SnapshotSource for FixedSnapshot {
    async fn poll_snapshot(&mut self) -> Result<Option<RecordBatch>, OperatorError> {
        if self.batches.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.batches.remove(0)))
    }
}

/// Builds a two-column `(id VARCHAR, name VARCHAR)` dimension batch.
///
/// # Panics
///
/// Panics if the batch cannot be constructed; test fixture only.
#[must_use]
pub fn id_name_batch(rows: &[(&str, &str)]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("name", DataType::Utf8, true),
    ]));
    let ids: Vec<&str> = rows.iter().map(|(id, _)| *id).collect();
    let names: Vec<&str> = rows.iter().map(|(_, name)| *name).collect();
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}

/// Builds a single-row `(id VARCHAR, amount BIGINT)` stream batch.
///
/// # Panics
///
/// Panics if the batch cannot be constructed; test fixture only.
#[must_use]
pub fn id_amount_batch(id: &str, amount: i64) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, true),
        Field::new("amount", DataType::Int64, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec![id])),
            Arc::new(Int64Array::from(vec![amount])),
        ],
    )
    .unwrap()
}
