//! # Rill Connectors
//!
//! Table metadata model and connector plugin layer for Rill.
//!
//! A declared table (`CREATE TABLE ... WITH (type = '...', ...)`) is wired
//! to a connector implementation through a session-owned
//! [`registry::ConnectorRegistry`]. Connectors register per table role;
//! dimension ("side") connectors additionally register per cache strategy.
//!
//! ## Architecture
//!
//! ```text
//! DDL ──▶ classifier ──▶ ConnectorRegistry.resolve_{source,sink,side}
//!                               │
//!                               ▼  (at most one instance per key)
//!                         TableParser / SideConnector
//!                               │
//!                               ▼
//!                  TableInfo / SideTableInfo / join operator
//! ```
//!
//! - [`table`] - Roles, cache strategies, table metadata, temporal marker
//! - [`config`] - `WITH (...)` property bag, case-insensitive keys
//! - [`connector`] - Core traits (`TableParser`, `SideConnector`)
//! - [`registry`] - Per-role factory catalogs with cached resolution
//! - [`factory`] - Plugin-unit naming convention
//! - [`memory`] - Built-in connector backed by inline JSON rows
//! - [`testing`] - Connector doubles and batch fixtures

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Connector error types.
pub mod error;

/// Connector configuration types.
pub mod config;

/// Table roles, cache strategies, and table metadata.
pub mod table;

/// Core connector traits.
pub mod connector;

/// Plugin-unit naming convention.
pub mod factory;

/// Connector registry with factory pattern.
pub mod registry;

/// Built-in `memory` connector.
pub mod memory;

/// Testing utilities (connector doubles, batch fixtures).
pub mod testing;

pub use config::ConnectorConfig;
pub use connector::{DefaultTableParser, SideConnector, TableParser};
pub use error::ConnectorError;
pub use registry::{ConnectorRegistry, SideFactory, SinkFactory, SourceFactory};
pub use table::{CacheMode, Column, SideTableInfo, TableInfo, TableRole};
