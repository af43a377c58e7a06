//! Core connector traits.
//!
//! Every connector implements [`TableParser`]: the registry hands a parser
//! the declared table's name, raw column text, and `WITH` properties, and
//! gets back validated [`TableInfo`]. Dimension ("side") connectors also
//! implement [`SideConnector`], which adds the join-operator constructor
//! and the snapshot opener.
//!
//! [`DefaultTableParser`] covers connectors whose DDL is the plain
//! `name TYPE` column form; connectors with richer declarations supply
//! their own parser.

use arrow_schema::{DataType, SchemaRef, TimeUnit};
use async_trait::async_trait;

use rill_core::{
    FieldInfo, FullCacheJoinOperator, JoinInfo, SideJoinOperator, SnapshotSource,
};

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::table::{
    is_temporal_marker, split_declarations, CacheMode, Column, SideTableInfo, TableInfo, TableRole,
};

/// Parses a declared table into connector-validated metadata.
///
/// Implementations must be stateless with respect to individual tables: the
/// registry instantiates one parser per connector type and reuses it for
/// every table of that type.
pub trait TableParser: Send + Sync {
    /// Builds [`TableInfo`] from the declaration.
    ///
    /// `fields_text` is the raw column list exactly as written between the
    /// outer parentheses; the temporal marker, if present, must be excluded
    /// from the resulting columns.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaError` for undeclarable columns or
    /// `ConnectorError::ConfigurationError` for invalid properties.
    fn parse_table(
        &self,
        name: &str,
        fields_text: &str,
        config: ConnectorConfig,
    ) -> Result<TableInfo, ConnectorError>;
}

impl std::fmt::Debug for dyn TableParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TableParser")
    }
}

impl std::fmt::Debug for dyn SideConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SideConnector")
    }
}

/// A connector that can serve a table as the dimension side of a join.
#[async_trait]
pub trait SideConnector: TableParser {
    /// Builds the join operator for a dimension table.
    ///
    /// The constructor contract is fixed across all side connectors:
    /// the stream's input schema, the join description, the output field
    /// list, and the dimension table metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be configured, or if the
    /// declared cache strategy has no engine.
    fn build_side_operator(
        &self,
        input_schema: SchemaRef,
        join_info: JoinInfo,
        out_fields: Vec<FieldInfo>,
        side: &SideTableInfo,
    ) -> Result<Box<dyn SideJoinOperator>, ConnectorError> {
        match side.cache_mode() {
            CacheMode::Full => Ok(Box::new(FullCacheJoinOperator::new(
                input_schema,
                join_info,
                out_fields,
            )?)),
            CacheMode::LruAsync => Err(ConnectorError::ConfigurationError(format!(
                "table '{}': no join engine for cache mode 'lru'",
                side.table().name()
            ))),
        }
    }

    /// Opens the dimension dataset for a full load.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SnapshotFailed` if the dataset cannot be
    /// opened.
    async fn open_snapshot(
        &self,
        side: &SideTableInfo,
    ) -> Result<Box<dyn SnapshotSource>, ConnectorError>;
}

/// Table parser for the plain `name TYPE` column declaration form.
#[derive(Debug, Clone)]
pub struct DefaultTableParser {
    connector_type: String,
    role: TableRole,
}

impl DefaultTableParser {
    /// Creates a parser for the given connector type and role.
    #[must_use]
    pub fn new(connector_type: impl Into<String>, role: TableRole) -> Self {
        Self {
            connector_type: connector_type.into(),
            role,
        }
    }

    /// Parses the raw column list, dropping the temporal marker.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::SchemaError` for malformed declarations or
    /// unsupported type names.
    pub fn parse_columns(fields_text: &str) -> Result<Vec<Column>, ConnectorError> {
        let mut columns = Vec::new();
        for declaration in split_declarations(fields_text) {
            if is_temporal_marker(declaration) {
                continue;
            }
            let Some((name, type_text)) = declaration.split_once(char::is_whitespace) else {
                return Err(ConnectorError::SchemaError(format!(
                    "column declaration '{declaration}' has no type"
                )));
            };
            let (type_text, default) = split_type_and_default(type_text.trim());
            let data_type = parse_data_type(type_text)?;
            columns.push(match default {
                Some(literal) => Column::with_default(name, data_type, literal),
                None => Column::new(name, data_type),
            });
        }
        Ok(columns)
    }
}

/// Splits `TYPE [DEFAULT literal]` at the first top-level `DEFAULT` keyword.
fn split_type_and_default(text: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                let rest = text[i..].trim_start();
                if rest.len() > 7
                    && rest[..7].eq_ignore_ascii_case("DEFAULT")
                    && rest.as_bytes()[7].is_ascii_whitespace()
                {
                    let literal = rest[7..].trim();
                    if !literal.is_empty() {
                        return (text[..i].trim_end(), Some(literal));
                    }
                }
            }
            _ => {}
        }
    }
    (text, None)
}

impl TableParser for DefaultTableParser {
    fn parse_table(
        &self,
        name: &str,
        fields_text: &str,
        config: ConnectorConfig,
    ) -> Result<TableInfo, ConnectorError> {
        let columns = Self::parse_columns(fields_text)?;
        if columns.is_empty() {
            return Err(ConnectorError::SchemaError(format!(
                "table '{name}' declares no data columns"
            )));
        }
        Ok(TableInfo::new(
            name,
            self.connector_type.clone(),
            self.role,
            columns,
            config,
        ))
    }
}

/// Maps a declared SQL type name to an Arrow data type.
fn parse_data_type(type_text: &str) -> Result<DataType, ConnectorError> {
    let upper = type_text.to_uppercase();
    if let Some(args) = upper.strip_prefix("DECIMAL(").and_then(|s| s.strip_suffix(')')) {
        let (precision, scale) = args.split_once(',').ok_or_else(|| {
            ConnectorError::SchemaError(format!("malformed DECIMAL type '{type_text}'"))
        })?;
        let precision: u8 = precision.trim().parse().map_err(|_| {
            ConnectorError::SchemaError(format!("malformed DECIMAL precision in '{type_text}'"))
        })?;
        let scale: i8 = scale.trim().parse().map_err(|_| {
            ConnectorError::SchemaError(format!("malformed DECIMAL scale in '{type_text}'"))
        })?;
        return Ok(DataType::Decimal128(precision, scale));
    }
    // VARCHAR(n) and CHAR(n) lengths are advisory only.
    let base = upper.split('(').next().unwrap_or(&upper).trim();
    match base {
        "VARCHAR" | "CHAR" | "STRING" | "TEXT" => Ok(DataType::Utf8),
        "TINYINT" | "SMALLINT" | "INT" | "INTEGER" => Ok(DataType::Int32),
        "BIGINT" | "LONG" => Ok(DataType::Int64),
        "FLOAT" | "REAL" => Ok(DataType::Float32),
        "DOUBLE" => Ok(DataType::Float64),
        "BOOLEAN" | "BOOL" => Ok(DataType::Boolean),
        "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp(TimeUnit::Microsecond, None)),
        "DATE" => Ok(DataType::Date32),
        other => Err(ConnectorError::SchemaError(format!(
            "unsupported column type '{other}'"
        ))),
    }
}
