//! Data models for the DB Gateway.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{DatabaseConfig, DatabaseType};
pub use query::{DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT, QueryParam, QueryResult, effective_limit};
pub use schema::{ColumnDescriptor, SchemaSnapshot, TableDescriptor, TableEntry};
