//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - A single backend connection and its transactions
//! - The result cursor
//! - Client-side parameter binding
//! - Statement counting for the multi-statement switch
//! - Type mappings
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connection;
pub mod cursor;
pub mod params;
pub mod statement;
pub mod types;

pub use connection::{DbConnection, DbTransaction, StatementOutcome};
pub use cursor::{Cursor, CursorState, DEFAULT_ARRAYSIZE};
pub use params::{BoundStatement, bind_statement};
pub use statement::{count_statements, ensure_single_statement};
