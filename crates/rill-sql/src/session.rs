//! Compilation session: registry plus table catalog.
//!
//! A [`SqlSession`] owns everything a compilation unit needs: the connector
//! registry it resolves against and the tables declared so far. Sessions
//! share nothing; dropping one drops its registrations, its resolved
//! connector instances, and its catalog together.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use rill_connectors::{
    ConnectorError, ConnectorRegistry, SideConnector, SideTableInfo, TableInfo, TableRole,
};

use crate::classifier::{ParsedTable, TableInfoParser};
use crate::exec::{self, ExecError, SchemaLookup, SinkColumn};
use crate::parser::{parse_create_table, ParseError};

/// Session-level errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// DDL parse failure.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Connector resolution or table validation failure.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// A table name was declared twice.
    #[error("table '{0}' is already registered")]
    DuplicateTable(String),

    /// The named table is not in the catalog.
    #[error("table '{0}' is not registered")]
    UnknownTable(String),
}

/// One compilation unit's registry and table catalog.
pub struct SqlSession {
    registry: ConnectorRegistry,
    classifier: TableInfoParser,
    sources: HashMap<String, TableInfo>,
    sinks: HashMap<String, TableInfo>,
    sides: HashMap<String, SideTableInfo>,
}

impl SqlSession {
    /// Creates a session with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ConnectorRegistry::new())
    }

    /// Creates a session around a pre-populated registry.
    #[must_use]
    pub fn with_registry(registry: ConnectorRegistry) -> Self {
        Self {
            registry,
            classifier: TableInfoParser::new(),
            sources: HashMap::new(),
            sinks: HashMap::new(),
            sides: HashMap::new(),
        }
    }

    /// The session's registry, for connector registration.
    #[must_use]
    pub fn registry(&self) -> &ConnectorRegistry {
        &self.registry
    }

    /// Parses, classifies, and stores one `CREATE TABLE` declaration.
    ///
    /// `declared_role` is the role implied by the DDL pass; declarations
    /// carrying the temporal marker land in the side catalog regardless.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the declaration cannot be parsed, no
    /// connector covers it, or the name is already taken within the role.
    pub fn register_table(
        &mut self,
        declared_role: TableRole,
        sql: &str,
    ) -> Result<ParsedTable, SessionError> {
        let stmt = parse_create_table(sql)?;
        let parsed = self
            .classifier
            .parse(&self.registry, declared_role, &stmt)?;

        let name = parsed.table().name().to_string();
        match &parsed {
            ParsedTable::Source(table) => {
                if self.sources.contains_key(&name) {
                    return Err(SessionError::DuplicateTable(name));
                }
                self.sources.insert(name.clone(), table.clone());
            }
            ParsedTable::Sink(table) => {
                if self.sinks.contains_key(&name) {
                    return Err(SessionError::DuplicateTable(name));
                }
                self.sinks.insert(name.clone(), table.clone());
            }
            ParsedTable::Side(side) => {
                if self.sides.contains_key(&name) {
                    return Err(SessionError::DuplicateTable(name));
                }
                self.sides.insert(name.clone(), side.clone());
            }
        }
        debug!(table = %name, "table registered");
        Ok(parsed)
    }

    /// Looks up a registered source table.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&TableInfo> {
        self.sources.get(name)
    }

    /// Looks up a registered sink table.
    #[must_use]
    pub fn sink(&self, name: &str) -> Option<&TableInfo> {
        self.sinks.get(name)
    }

    /// Looks up a registered side table.
    #[must_use]
    pub fn side(&self, name: &str) -> Option<&SideTableInfo> {
        self.sides.get(name)
    }

    /// Resolves the connector serving a registered side table.
    ///
    /// Resolution goes through the registry's instance cache, so repeated
    /// calls return the same connector.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::UnknownTable`] if the table is not in the
    /// side catalog, or the registry's error if its connector is gone.
    pub fn side_connector(
        &self,
        name: &str,
    ) -> Result<(Arc<dyn SideConnector>, &SideTableInfo), SessionError> {
        let side = self
            .sides
            .get(name)
            .ok_or_else(|| SessionError::UnknownTable(name.to_string()))?;
        let connector = self
            .registry
            .resolve_side(side.table().connector_type(), side.cache_mode())?;
        Ok((connector, side))
    }

    /// Rewrites an `INSERT INTO sink <query>` statement against the
    /// session's sink catalog.
    ///
    /// # Errors
    ///
    /// See [`exec::rewrite_insert`].
    pub fn rewrite_insert(&self, sql: &str) -> Result<String, ExecError> {
        exec::rewrite_insert(sql, self)
    }
}

impl SchemaLookup for SqlSession {
    fn sink_columns(&self, table: &str) -> Option<Vec<SinkColumn>> {
        let sink = self.sinks.get(table)?;
        Some(
            sink.columns()
                .iter()
                .map(|c| SinkColumn {
                    name: c.name.clone(),
                    default: c.default.clone(),
                })
                .collect(),
        )
    }
}

impl Default for SqlSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("sources", &self.sources.keys())
            .field("sinks", &self.sinks.keys())
            .field("sides", &self.sides.keys())
            .finish_non_exhaustive()
    }
}
