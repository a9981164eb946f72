//! DB Gateway Library
//!
//! A read-only gateway that lets AI assistants inspect and query a single SQL
//! database (PostgreSQL, MySQL or SQLite) over line-delimited JSON on stdio.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod protocol;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use protocol::GatewayService;
