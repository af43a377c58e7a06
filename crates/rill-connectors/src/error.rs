//! Connector error types.

use thiserror::Error;

use rill_core::OperatorError;

use crate::table::TableRole;

/// Errors that can occur while resolving or instantiating connectors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Invalid connector configuration.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Required configuration key is missing.
    #[error("missing required property: {0}")]
    MissingConfig(String),

    /// No connector is registered for the requested type and role.
    ///
    /// Fatal to the owning compilation unit; the table cannot be wired.
    #[error("no {role} connector registered for type '{connector_type}' (plugin unit '{plugin_unit}')")]
    UnsupportedType {
        /// Role the table was declared with.
        role: TableRole,
        /// Value of the `type` property.
        connector_type: String,
        /// Plugin unit locator computed from the naming convention.
        plugin_unit: String,
    },

    /// A column declaration could not be understood.
    #[error("schema error: {0}")]
    SchemaError(String),

    /// A dimension dataset could not be read.
    #[error("snapshot load failed: {0}")]
    SnapshotFailed(String),

    /// Error surfaced by the operator layer.
    #[error(transparent)]
    Operator(#[from] OperatorError),
}
