//! MySQL Session Library
//!
//! A blocking, single-connection database session for MySQL (and SQLite). It
//! runs statements in scoped transactions that commit on success and roll back
//! on failure, and returns fetched rows as records with named fields.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod session;

pub use config::{Config, ConnectionOptions};
pub use db::{Cursor, DEFAULT_ARRAYSIZE};
pub use error::{DbError, DbResult};
pub use models::{ColumnMetadata, ConnectionInfo, DatabaseType, Params, QueryParam, Record};
pub use session::{Execute, ExecuteMany, Session};
