//! Full wiring test: DDL in, connector resolution, snapshot load, joined
//! events out, and insert rewriting against the same session.

use std::sync::Arc;

use arrow_array::{Int64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};

use rill_core::{load_full_snapshot, Event, FieldInfo, JoinInfo, SideJoinType};
use rill_connectors::memory::register_memory_connector;
use rill_connectors::testing::{id_name_batch, CountingSideConnector};
use rill_connectors::{CacheMode, ConnectorError, TableRole};
use rill_sql::{ExecError, SqlSession};

fn orders_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("customer_id", DataType::Utf8, true),
        Field::new("amount", DataType::Int64, true),
    ]))
}

fn order_event(customer_id: &str, amount: i64) -> Event {
    let batch = RecordBatch::try_new(
        orders_schema(),
        vec![
            Arc::new(StringArray::from(vec![customer_id])),
            Arc::new(Int64Array::from(vec![amount])),
        ],
    )
    .unwrap();
    Event::new(0, batch)
}

fn join_info() -> JoinInfo {
    JoinInfo {
        left_table: "orders".to_string(),
        right_table: "customers".to_string(),
        stream_key_column: "customer_id".to_string(),
        table_key_column: "id".to_string(),
        join_type: SideJoinType::Inner,
    }
}

fn out_fields() -> Vec<FieldInfo> {
    vec![
        FieldInfo::new("orders", "customer_id", DataType::Utf8),
        FieldInfo::new("orders", "amount", DataType::Int64),
        FieldInfo::new("customers", "name", DataType::Utf8),
    ]
}

#[tokio::test]
async fn test_ddl_to_joined_events() {
    let mut session = SqlSession::new();
    register_memory_connector(session.registry());

    session
        .register_table(
            TableRole::Source,
            "CREATE TABLE orders (customer_id VARCHAR, amount BIGINT) WITH ('type' = 'memory')",
        )
        .unwrap();
    session
        .register_table(
            TableRole::Source,
            "CREATE TABLE customers (
                id VARCHAR,
                name VARCHAR,
                PERIOD FOR SYSTEM_TIME
            ) WITH (
                'type' = 'memory',
                'cache' = 'full',
                'data' = '[{\"id\": \"c1\", \"name\": \"Alice\"}, {\"id\": \"c2\", \"name\": \"Bob\"}]'
            )",
        )
        .unwrap();

    // The marked declaration went to the side catalog even though it
    // arrived on the source pass.
    assert!(session.source("customers").is_none());
    let (connector, side) = session.side_connector("customers").unwrap();
    assert_eq!(side.cache_mode(), CacheMode::Full);

    let mut snapshot_source = connector.open_snapshot(side).await.unwrap();
    let snapshot = load_full_snapshot(snapshot_source.as_mut()).await.unwrap();

    let mut operator = connector
        .build_side_operator(orders_schema(), join_info(), out_fields(), side)
        .unwrap();
    operator.open(snapshot).unwrap();

    let joined = operator.process(&order_event("c1", 100));
    assert_eq!(joined.len(), 1);
    let names = joined[0]
        .data
        .column_by_name("name")
        .unwrap()
        .as_any()
        .downcast_ref::<StringArray>()
        .unwrap();
    assert_eq!(names.value(0), "Alice");

    // Unknown customer drops on an inner join.
    assert!(operator.process(&order_event("c9", 5)).is_empty());
    assert_eq!(operator.metrics().events_dropped, 1);
}

#[tokio::test]
async fn test_third_party_side_connector_resolution() {
    let mut session = SqlSession::new();
    let (factory, count) = CountingSideConnector::factory_with_batches(
        "mysql",
        vec![id_name_batch(&[("c1", "Alice")])],
    );
    session
        .registry()
        .register_side("mysql", CacheMode::Full, factory);

    let ddl = "CREATE TABLE customers (id VARCHAR, name VARCHAR, PERIOD FOR SYSTEM_TIME) \
               WITH ('type' = 'mysql', 'cache' = 'full')";
    session.register_table(TableRole::Source, ddl).unwrap();

    // Registering more tables of the same type reuses the instance.
    let ddl2 = "CREATE TABLE suppliers (id VARCHAR, name VARCHAR, PERIOD FOR SYSTEM_TIME) \
                WITH ('type' = 'mysql')";
    session.register_table(TableRole::Source, ddl2).unwrap();
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);

    let (connector, side) = session.side_connector("customers").unwrap();
    let mut snapshot_source = connector.open_snapshot(side).await.unwrap();
    let snapshot = load_full_snapshot(snapshot_source.as_mut()).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].num_rows(), 1);
}

#[test]
fn test_unregistered_side_type_is_fatal_with_unit_name() {
    let mut session = SqlSession::new();
    register_memory_connector(session.registry());

    let err = session
        .register_table(
            TableRole::Source,
            "CREATE TABLE dim (id VARCHAR, PERIOD FOR SYSTEM_TIME) \
             WITH ('type' = 'mysql', 'cache' = 'full')",
        )
        .unwrap_err();
    assert!(err.to_string().contains("mysqlallside"));
}

#[test]
fn test_insert_rewrite_against_session_catalog() {
    let mut session = SqlSession::new();
    register_memory_connector(session.registry());

    session
        .register_table(
            TableRole::Sink,
            "CREATE TABLE results (
                customer VARCHAR,
                amount BIGINT,
                region VARCHAR DEFAULT 'unknown',
                tablename VARCHAR
            ) WITH ('type' = 'memory')",
        )
        .unwrap();

    let rewritten = session
        .rewrite_insert("INSERT INTO results SELECT amount, customer FROM joined")
        .unwrap();
    assert_eq!(
        rewritten,
        "INSERT INTO results SELECT customer, amount, 'unknown' AS region, tablename \
         FROM (SELECT amount, customer FROM joined) AS q"
    );

    let err = session
        .rewrite_insert("INSERT INTO results SELECT customer FROM joined")
        .unwrap_err();
    match err {
        ExecError::SchemaMismatch {
            query_columns,
            sink_columns,
            ..
        } => {
            assert_eq!(query_columns, vec!["customer"]);
            assert!(sink_columns.contains(&"amount".to_string()));
        }
        other => panic!("expected schema mismatch, got {other}"),
    }
}

#[test]
fn test_lru_declared_but_not_served() {
    let mut session = SqlSession::new();
    register_memory_connector(session.registry());

    // The memory connector registers only the full-cache unit.
    let err = session
        .register_table(
            TableRole::Source,
            "CREATE TABLE dim (id VARCHAR, PERIOD FOR SYSTEM_TIME) \
             WITH ('type' = 'memory', 'cache' = 'lru')",
        )
        .unwrap_err();
    assert!(err.to_string().contains("memorylruside"));
    let rill_sql::SessionError::Connector(ConnectorError::UnsupportedType { .. }) = err else {
        panic!("expected unsupported type, got {err}");
    };
}
