//! # Rill SQL
//!
//! DDL front end for Rill: parses `CREATE TABLE ... WITH (...)`
//! declarations, classifies them into source, sink, and dimension tables,
//! and rewrites `INSERT` statements so sink columns are matched by name.
//!
//! ```text
//! CREATE TABLE ─▶ parser ─▶ classifier ─▶ connector registry
//!                                             │
//!                                             ▼
//!                              SqlSession catalog (sources/sinks/sides)
//!                                             │
//! INSERT INTO ... ─▶ exec::rewrite_insert ◀───┘
//! ```
//!
//! - [`parser`] - `CREATE TABLE` parsing, raw column list preserved
//! - [`classifier`] - Role classification and connector dispatch
//! - [`exec`] - Insert field mapping against declared sink schemas
//! - [`session`] - Registry plus catalog ownership for one compilation unit

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// DDL parsing.
pub mod parser;

/// Table classification and connector dispatch.
pub mod classifier;

/// Insert field mapping.
pub mod exec;

/// Compilation session.
pub mod session;

pub use classifier::{ParsedTable, TableInfoParser};
pub use exec::{rewrite_insert, ExecError, SchemaLookup, SinkColumn};
pub use parser::{parse_create_table, CreateTableStatement, ParseError};
pub use session::{SessionError, SqlSession};
