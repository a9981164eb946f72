//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Single-connection management
//! - Per-engine SQL dialects
//! - Query execution
//! - Schema introspection
//! - Column value decoding
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod connection;
pub mod dialect;
pub mod executor;
pub mod schema;
pub mod types;

pub use connection::{ConnectionManager, DbConnection};
pub use dialect::{SqlDialect, dialect_for};
pub use executor::{JsonRecord, QueryExecutor};
pub use schema::SchemaInspector;
