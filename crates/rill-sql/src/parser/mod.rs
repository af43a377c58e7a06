//! DDL parsing for table declarations.
//!
//! Only the `CREATE TABLE` form is handled here; continuous queries and
//! `INSERT` statements go through [`crate::exec`] untouched.

pub mod create_table;

pub use create_table::{parse_create_table, CreateTableStatement};

/// SQL parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Standard SQL parse error.
    #[error("SQL parse error: {0}")]
    SqlParseError(#[from] sqlparser::parser::ParserError),

    /// Table declaration parse error.
    #[error("table declaration error: {0}")]
    DeclarationError(String),
}
