//! Table metadata model.
//!
//! A declared table is classified into one of three [`TableRole`]s, and the
//! dimension ("side") role additionally carries a [`CacheMode`]. Roles and
//! cache strategies are closed sets; connectors plug in per role and per
//! strategy through the registry, not by extending these enums.
//!
//! This module also owns the temporal-marker matcher: a dimension table is
//! recognized by a column declaration reading `PERIOD FOR SYSTEM_TIME`
//! (case-insensitive, whitespace-tolerant). The marker carries no data and
//! is excluded from the table's schema.

use std::fmt;
use std::sync::LazyLock;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use regex::Regex;

use crate::config::ConnectorConfig;
use crate::error::ConnectorError;

/// The role a declared table plays in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    /// Streaming input.
    Source,
    /// Streaming output.
    Sink,
    /// Bounded dimension table joined against the stream.
    Side,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRole::Source => write!(f, "source"),
            TableRole::Sink => write!(f, "sink"),
            TableRole::Side => write!(f, "side"),
        }
    }
}

/// Cache strategy for a dimension table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Load the entire dimension dataset into memory at startup.
    #[default]
    Full,
    /// Per-key asynchronous lookups with an LRU cache.
    ///
    /// Declared for plugin-unit naming; no join engine ships for it.
    LruAsync,
}

impl CacheMode {
    /// Parses the `cache` property value.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` for values outside the
    /// declared strategy set.
    pub fn parse(value: &str) -> Result<Self, ConnectorError> {
        match value.to_lowercase().as_str() {
            "full" | "all" => Ok(CacheMode::Full),
            "lru" => Ok(CacheMode::LruAsync),
            other => Err(ConnectorError::ConfigurationError(format!(
                "unknown cache mode '{other}' (expected 'full' or 'lru')"
            ))),
        }
    }

    /// The plugin-unit suffix this strategy contributes.
    #[must_use]
    pub fn unit_suffix(self) -> &'static str {
        match self {
            CacheMode::Full => "allside",
            CacheMode::LruAsync => "lruside",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::Full => write!(f, "full"),
            CacheMode::LruAsync => write!(f, "lru"),
        }
    }
}

/// A declared table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Arrow data type.
    pub data_type: DataType,
    /// `DEFAULT` literal as written in the declaration, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a column without a default.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
        }
    }

    /// Creates a column with a `DEFAULT` literal.
    #[must_use]
    pub fn with_default(
        name: impl Into<String>,
        data_type: DataType,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: Some(default.into()),
        }
    }
}

/// Immutable metadata for a declared table.
///
/// Produced by a connector's table parser; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TableInfo {
    name: String,
    connector_type: String,
    role: TableRole,
    columns: Vec<Column>,
    config: ConnectorConfig,
}

impl TableInfo {
    /// Creates table metadata.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        connector_type: impl Into<String>,
        role: TableRole,
        columns: Vec<Column>,
        config: ConnectorConfig,
    ) -> Self {
        Self {
            name: name.into(),
            connector_type: connector_type.into(),
            role,
            columns,
            config,
        }
    }

    /// Table name as declared.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of the `type` property.
    #[must_use]
    pub fn connector_type(&self) -> &str {
        &self.connector_type
    }

    /// Role the table was classified into.
    #[must_use]
    pub fn role(&self) -> TableRole {
        self.role
    }

    /// Declared columns, marker excluded.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Table properties from the `WITH` clause.
    #[must_use]
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Arrow schema of the declared columns.
    #[must_use]
    pub fn schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.data_type.clone(), true))
            .collect();
        SchemaRef::new(Schema::new(fields))
    }
}

/// Metadata for a dimension table: the table plus its cache strategy.
#[derive(Debug, Clone)]
pub struct SideTableInfo {
    table: TableInfo,
    cache_mode: CacheMode,
}

impl SideTableInfo {
    /// Wraps table metadata with its cache strategy.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::ConfigurationError` if the table's `cache`
    /// property names an unknown strategy. An absent property defaults to
    /// [`CacheMode::Full`].
    pub fn from_table(table: TableInfo) -> Result<Self, ConnectorError> {
        let cache_mode = match table.config().get("cache") {
            Some(value) => CacheMode::parse(value)?,
            None => CacheMode::default(),
        };
        Ok(Self { table, cache_mode })
    }

    /// The underlying table metadata.
    #[must_use]
    pub fn table(&self) -> &TableInfo {
        &self.table
    }

    /// The declared cache strategy.
    #[must_use]
    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }
}

static TEMPORAL_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^PERIOD\s+FOR\s+SYSTEM_TIME$").expect("temporal marker pattern is valid")
});

/// Returns true if a single column declaration is the temporal marker.
#[must_use]
pub fn is_temporal_marker(declaration: &str) -> bool {
    TEMPORAL_MARKER.is_match(declaration.trim())
}

/// Splits a raw column list on top-level commas.
///
/// Commas inside parentheses (e.g. `DECIMAL(10,2)`) do not split.
#[must_use]
pub fn split_declarations(fields_text: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, ch) in fields_text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                declarations.push(&fields_text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&fields_text[start..]);
    declarations
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect()
}

/// Returns true if any top-level declaration in the column list is the
/// temporal marker.
#[must_use]
pub fn has_temporal_marker(fields_text: &str) -> bool {
    split_declarations(fields_text)
        .iter()
        .any(|d| is_temporal_marker(d))
}
