//! Table classification and connector dispatch.
//!
//! [`TableInfoParser`] turns a parsed `CREATE TABLE` declaration into
//! connector-validated table metadata. The declared role comes from
//! context (which DDL pass the statement arrived on); a source declaration
//! carrying the temporal marker is reclassified as a dimension table before
//! dispatch.

use tracing::debug;

use rill_connectors::table::has_temporal_marker;
use rill_connectors::{
    CacheMode, ConnectorConfig, ConnectorError, ConnectorRegistry, SideTableInfo, TableInfo,
    TableRole,
};

use crate::parser::CreateTableStatement;

/// A classified, connector-validated table declaration.
#[derive(Debug, Clone)]
pub enum ParsedTable {
    /// Streaming input.
    Source(TableInfo),
    /// Streaming output.
    Sink(TableInfo),
    /// Dimension table.
    Side(SideTableInfo),
}

impl ParsedTable {
    /// The underlying table metadata, whatever the role.
    #[must_use]
    pub fn table(&self) -> &TableInfo {
        match self {
            ParsedTable::Source(table) | ParsedTable::Sink(table) => table,
            ParsedTable::Side(side) => side.table(),
        }
    }
}

/// Classifies table declarations and dispatches them to connectors.
#[derive(Debug, Default)]
pub struct TableInfoParser;

impl TableInfoParser {
    /// Creates a classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classifies one declaration and runs it through the connector
    /// resolved from `registry`.
    ///
    /// `declared_role` is the role implied by the DDL pass; only
    /// [`TableRole::Source`] declarations are eligible for reclassification
    /// as dimension tables.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MissingConfig` if the `type` property is
    /// absent, `ConnectorError::UnsupportedType` if no connector is
    /// registered for the resolved role and type, or whatever the
    /// connector's own table parser rejects.
    pub fn parse(
        &self,
        registry: &ConnectorRegistry,
        declared_role: TableRole,
        stmt: &CreateTableStatement,
    ) -> Result<ParsedTable, ConnectorError> {
        let config = ConnectorConfig::from_properties(stmt.properties.clone());
        let connector_type = config.require("type")?.to_string();

        let role = match declared_role {
            TableRole::Source if has_temporal_marker(&stmt.fields_text) => TableRole::Side,
            other => other,
        };
        if role != declared_role {
            debug!(table = %stmt.name, "temporal marker present, classified as side table");
        }

        match role {
            TableRole::Source => {
                let parser = registry.resolve_source(&connector_type)?;
                let table = parser.parse_table(&stmt.name, &stmt.fields_text, config)?;
                debug!(table = %stmt.name, connector = %connector_type, "registered source table");
                Ok(ParsedTable::Source(table))
            }
            TableRole::Sink => {
                let parser = registry.resolve_sink(&connector_type)?;
                let table = parser.parse_table(&stmt.name, &stmt.fields_text, config)?;
                debug!(table = %stmt.name, connector = %connector_type, "registered sink table");
                Ok(ParsedTable::Sink(table))
            }
            TableRole::Side => {
                let cache_mode = match config.get("cache") {
                    Some(value) => CacheMode::parse(value)?,
                    None => CacheMode::default(),
                };
                let connector = registry.resolve_side(&connector_type, cache_mode)?;
                let table = connector.parse_table(&stmt.name, &stmt.fields_text, config)?;
                let side = SideTableInfo::from_table(table)?;
                debug!(
                    table = %stmt.name,
                    connector = %connector_type,
                    cache = %cache_mode,
                    "registered side table"
                );
                Ok(ParsedTable::Side(side))
            }
        }
    }
}
