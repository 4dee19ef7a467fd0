//! Data models for the session.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;
pub mod record;

// Re-export commonly used types
pub use connection::{ConnectionInfo, DatabaseType, mask_connection_string};
pub use query::{ColumnMetadata, Params, QueryParam};
pub use record::Record;
