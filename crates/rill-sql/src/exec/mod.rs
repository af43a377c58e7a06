//! Insert field mapping.
//!
//! `INSERT INTO sink <query>` statements are rewritten so that the query's
//! output columns are matched to the sink's declared columns by **name**,
//! not position:
//!
//! - a sink column present in the query is selected by name;
//! - a sink column with a `DEFAULT` gets `COALESCE(col, default) AS col`
//!   when the query provides it, or the default literal alone when it does
//!   not;
//! - the reserved `tablename` routing column is skipped wherever it appears
//!   in the sink's declaration and appended exactly once at the end;
//! - a sink column that is neither provided nor defaulted fails with an
//!   error naming both column lists.
//!
//! When the query's output names cannot be determined statically (wildcards
//! or unaliased expressions), the statement is passed through unchanged and
//! validation is left to the executing runtime.

use sqlparser::ast::{Expr, SelectItem, SetExpr, Statement, TableObject};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

/// Reserved routing column appended to every rewritten insert.
pub const ROUTING_COLUMN: &str = "tablename";

/// A sink column as the insert mapper sees it.
#[derive(Debug, Clone)]
pub struct SinkColumn {
    /// Column name.
    pub name: String,
    /// `DEFAULT` literal, if declared.
    pub default: Option<String>,
}

impl SinkColumn {
    /// Creates a column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// Creates a column with a `DEFAULT` literal.
    #[must_use]
    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// Resolves sink names to their declared columns.
///
/// The mapper reaches declared schemas only through this trait; whoever
/// owns the catalog implements it.
pub trait SchemaLookup {
    /// Declared columns of the named sink, or `None` if no such sink.
    fn sink_columns(&self, table: &str) -> Option<Vec<SinkColumn>>;
}

/// Insert rewriting errors.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Standard SQL parse error.
    #[error("SQL parse error: {0}")]
    SqlParseError(#[from] sqlparser::parser::ParserError),

    /// The statement is not a single `INSERT`.
    #[error("expected a single INSERT statement")]
    NotAnInsert,

    /// The insert uses a form the mapper does not handle.
    #[error("unsupported INSERT form: {0}")]
    UnsupportedInsert(String),

    /// The insert targets a sink that was never declared.
    #[error("unknown sink table '{0}'")]
    SinkNotFound(String),

    /// The query does not provide every required sink column.
    #[error(
        "insert into '{sink}' does not line up: query provides [{query}], sink declares [{decl}]",
        query = .query_columns.join(", "),
        decl = .sink_columns.join(", ")
    )]
    SchemaMismatch {
        /// The sink being inserted into.
        sink: String,
        /// Output column names of the inserted query.
        query_columns: Vec<String>,
        /// Declared column names of the sink.
        sink_columns: Vec<String>,
    },
}

/// Rewrites `INSERT INTO sink <query>` to project the query's columns onto
/// the sink's declared columns by name.
///
/// Returns the statement unchanged when the query's output column names
/// are not statically known.
///
/// # Errors
///
/// Returns [`ExecError`] for statements that are not a plain insert, target
/// an undeclared sink, or provably fail to cover the sink's columns.
pub fn rewrite_insert(sql: &str, schemas: &dyn SchemaLookup) -> Result<String, ExecError> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql)?;
    if statements.len() != 1 {
        return Err(ExecError::NotAnInsert);
    }
    let Statement::Insert(insert) = statements.remove(0) else {
        return Err(ExecError::NotAnInsert);
    };
    if !insert.columns.is_empty() {
        return Err(ExecError::UnsupportedInsert(
            "explicit insert column lists are not supported".to_string(),
        ));
    }
    let TableObject::TableName(name) = &insert.table else {
        return Err(ExecError::UnsupportedInsert(
            "insert target must be a plain table name".to_string(),
        ));
    };
    let sink = name.to_string();
    let sink_columns = schemas
        .sink_columns(&sink)
        .ok_or_else(|| ExecError::SinkNotFound(sink.clone()))?;
    let query = insert
        .source
        .ok_or_else(|| ExecError::UnsupportedInsert("insert carries no query".to_string()))?;

    let Some(query_columns) = query_output_columns(&query) else {
        debug!(sink = %sink, "query output columns not statically known, passing insert through");
        return Ok(sql.trim().to_string());
    };

    let projection = sink_projection(&sink, &sink_columns, &query_columns)?;
    Ok(format!(
        "INSERT INTO {sink} SELECT {} FROM ({query}) AS q",
        projection.join(", ")
    ))
}

/// Builds the projection list mapping `query_columns` onto `sink_columns`.
///
/// Returned items are SQL select-list fragments in the sink's declared
/// column order, with the routing column appended last.
///
/// # Errors
///
/// Returns [`ExecError::SchemaMismatch`] if a sink column without a default
/// is not provided by the query.
pub fn sink_projection(
    sink: &str,
    sink_columns: &[SinkColumn],
    query_columns: &[String],
) -> Result<Vec<String>, ExecError> {
    let mut projection = Vec::with_capacity(sink_columns.len() + 1);
    for column in sink_columns {
        if column.name.eq_ignore_ascii_case(ROUTING_COLUMN) {
            continue;
        }
        // Same matching rule as the routing-column skip: SQL identifiers
        // resolve case-insensitively.
        let provided = query_columns
            .iter()
            .any(|q| q.eq_ignore_ascii_case(&column.name));
        match (&column.default, provided) {
            (Some(default), true) => {
                projection.push(format!("COALESCE({0}, {default}) AS {0}", column.name));
            }
            (None, true) => projection.push(column.name.clone()),
            (Some(default), false) => {
                projection.push(format!("{default} AS {}", column.name));
            }
            (None, false) => {
                return Err(ExecError::SchemaMismatch {
                    sink: sink.to_string(),
                    query_columns: query_columns.to_vec(),
                    sink_columns: sink_columns.iter().map(|c| c.name.clone()).collect(),
                });
            }
        }
    }
    projection.push(ROUTING_COLUMN.to_string());
    Ok(projection)
}

/// Output column names of a query, when they are statically known.
fn query_output_columns(query: &sqlparser::ast::Query) -> Option<Vec<String>> {
    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };
    let mut columns = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(Expr::Identifier(ident)) => columns.push(ident.value.clone()),
            SelectItem::UnnamedExpr(Expr::CompoundIdentifier(parts)) => {
                columns.push(parts.last()?.value.clone());
            }
            SelectItem::ExprWithAlias { alias, .. } => columns.push(alias.value.clone()),
            _ => return None,
        }
    }
    Some(columns)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapLookup {
        sinks: HashMap<String, Vec<SinkColumn>>,
    }

    impl MapLookup {
        fn new() -> Self {
            Self {
                sinks: HashMap::new(),
            }
        }

        fn with_sink(mut self, name: &str, columns: Vec<SinkColumn>) -> Self {
            self.sinks.insert(name.to_string(), columns);
            self
        }
    }

    impl SchemaLookup for MapLookup {
        fn sink_columns(&self, table: &str) -> Option<Vec<SinkColumn>> {
            self.sinks.get(table).cloned()
        }
    }

    fn orders_sink() -> MapLookup {
        MapLookup::new().with_sink(
            "out",
            vec![
                SinkColumn::new("id"),
                SinkColumn::new("amount"),
                SinkColumn::new(ROUTING_COLUMN),
            ],
        )
    }

    #[test]
    fn test_rewrite_matches_by_name_not_position() {
        let sql = "INSERT INTO out SELECT amount, id FROM orders";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert_eq!(
            rewritten,
            "INSERT INTO out SELECT id, amount, tablename FROM (SELECT amount, id FROM orders) AS q"
        );
    }

    #[test]
    fn test_rewrite_uses_aliases() {
        let sql = "INSERT INTO out SELECT o.order_id AS id, o.total AS amount FROM orders o";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert!(rewritten.starts_with("INSERT INTO out SELECT id, amount, tablename FROM ("));
    }

    #[test]
    fn test_routing_column_skipped_in_place_and_appended_once() {
        let lookup = MapLookup::new().with_sink(
            "out",
            vec![
                SinkColumn::new("id"),
                SinkColumn::new(ROUTING_COLUMN),
                SinkColumn::new("amount"),
            ],
        );
        let rewritten =
            rewrite_insert("INSERT INTO out SELECT id, amount FROM orders", &lookup).unwrap();
        assert_eq!(rewritten.matches(ROUTING_COLUMN).count(), 1);
        assert!(rewritten.contains("SELECT id, amount, tablename FROM"));
    }

    #[test]
    fn test_routing_column_skip_is_case_insensitive() {
        let lookup = MapLookup::new().with_sink(
            "out",
            vec![SinkColumn::new("id"), SinkColumn::new("TableName")],
        );
        let rewritten = rewrite_insert("INSERT INTO out SELECT id FROM orders", &lookup).unwrap();
        assert!(rewritten.contains("SELECT id, tablename FROM"));
    }

    #[test]
    fn test_defaulted_column_present_gets_coalesce() {
        let lookup = MapLookup::new().with_sink(
            "out",
            vec![
                SinkColumn::new("id"),
                SinkColumn::with_default("region", "'unknown'"),
            ],
        );
        let rewritten =
            rewrite_insert("INSERT INTO out SELECT id, region FROM orders", &lookup).unwrap();
        assert!(rewritten.contains("COALESCE(region, 'unknown') AS region"));
    }

    #[test]
    fn test_defaulted_column_absent_uses_literal() {
        let lookup = MapLookup::new().with_sink(
            "out",
            vec![
                SinkColumn::new("id"),
                SinkColumn::with_default("region", "'unknown'"),
            ],
        );
        let rewritten = rewrite_insert("INSERT INTO out SELECT id FROM orders", &lookup).unwrap();
        assert!(rewritten.contains("'unknown' AS region"));
        assert!(!rewritten.contains("COALESCE"));
    }

    #[test]
    fn test_column_match_is_case_insensitive() {
        let lookup = MapLookup::new().with_sink(
            "out",
            vec![
                SinkColumn::new("Id"),
                SinkColumn::with_default("Region", "'unknown'"),
            ],
        );
        let rewritten =
            rewrite_insert("INSERT INTO out SELECT id, region FROM orders", &lookup).unwrap();
        assert!(rewritten.contains("SELECT Id, COALESCE(Region, 'unknown') AS Region, tablename"));
    }

    #[test]
    fn test_missing_required_column_is_descriptive() {
        let sql = "INSERT INTO out SELECT id FROM orders";
        let err = rewrite_insert(sql, &orders_sink()).unwrap_err();
        match &err {
            ExecError::SchemaMismatch {
                sink,
                query_columns,
                sink_columns,
            } => {
                assert_eq!(sink, "out");
                assert_eq!(query_columns, &["id"]);
                assert_eq!(sink_columns, &["id", "amount", "tablename"]);
            }
            other => panic!("expected schema mismatch, got {other}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("query provides [id]"));
        assert!(msg.contains("sink declares [id, amount, tablename]"));
    }

    #[test]
    fn test_extra_query_columns_are_dropped() {
        let sql = "INSERT INTO out SELECT id, amount, debug_info FROM orders";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert!(!rewritten.contains("debug_info FROM (SELECT id"));
        assert!(rewritten.contains("SELECT id, amount, tablename FROM"));
    }

    #[test]
    fn test_wildcard_passes_through() {
        let sql = "INSERT INTO out SELECT * FROM orders";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_unaliased_expression_passes_through() {
        let sql = "INSERT INTO out SELECT id, amount * 2 FROM orders";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert_eq!(rewritten, sql);
    }

    #[test]
    fn test_unknown_sink() {
        let err =
            rewrite_insert("INSERT INTO nowhere SELECT id FROM orders", &orders_sink())
                .unwrap_err();
        assert!(matches!(err, ExecError::SinkNotFound(_)));
    }

    #[test]
    fn test_not_an_insert() {
        let err = rewrite_insert("SELECT 1", &orders_sink()).unwrap_err();
        assert!(matches!(err, ExecError::NotAnInsert));
    }

    #[test]
    fn test_explicit_column_list_rejected() {
        let err = rewrite_insert(
            "INSERT INTO out (id, amount) SELECT id, amount FROM orders",
            &orders_sink(),
        )
        .unwrap_err();
        assert!(matches!(err, ExecError::UnsupportedInsert(_)));
    }

    #[test]
    fn test_compound_identifiers_use_last_part() {
        let sql = "INSERT INTO out SELECT o.id, o.amount FROM orders o";
        let rewritten = rewrite_insert(sql, &orders_sink()).unwrap();
        assert!(rewritten.contains("SELECT id, amount, tablename FROM"));
    }
}
