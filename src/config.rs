//! Configuration handling for the DB Gateway.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::db::connection::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::models::{DatabaseConfig, DatabaseType};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_SQLITE_PATH: &str = "database.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration for the DB Gateway.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-gateway",
    about = "Read-only database gateway speaking line-delimited JSON over stdio",
    version,
    author
)]
pub struct Config {
    /// Database engine (postgresql, mysql or sqlite)
    #[arg(
        long,
        default_value = "postgresql",
        value_parser = parse_db_type,
        env = "DB_TYPE"
    )]
    pub db_type: DatabaseType,

    /// Database server host (PostgreSQL/MySQL)
    #[arg(long, default_value = DEFAULT_DB_HOST, env = "DB_HOST")]
    pub db_host: String,

    /// Database server port (PostgreSQL/MySQL)
    #[arg(long, default_value_t = DEFAULT_DB_PORT, env = "DB_PORT")]
    pub db_port: u16,

    /// Database name (PostgreSQL/MySQL)
    #[arg(long, default_value = "", env = "DB_NAME")]
    pub db_name: String,

    /// Database user (PostgreSQL/MySQL)
    #[arg(long, default_value = "", env = "DB_USER")]
    pub db_user: String,

    /// Database password (PostgreSQL/MySQL)
    #[arg(
        long,
        default_value = "",
        env = "DB_PASSWORD",
        hide_env_values = true
    )]
    pub db_password: String,

    /// Path to the SQLite database file
    #[arg(long, default_value = DEFAULT_SQLITE_PATH, env = "DB_SQLITE_PATH")]
    pub db_sqlite_path: PathBuf,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "DB_CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// Query timeout in seconds (0 disables the timeout)
    #[arg(long, default_value_t = 0, env = "DB_QUERY_TIMEOUT")]
    pub query_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL, env = "DB_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_JSON_LOGS")]
    pub json_logs: bool,
}

fn parse_db_type(value: &str) -> Result<DatabaseType, String> {
    value.parse().map_err(|e: crate::error::DbError| e.to_string())
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            db_type: DatabaseType::PostgreSQL,
            db_host: DEFAULT_DB_HOST.to_string(),
            db_port: DEFAULT_DB_PORT,
            db_name: String::new(),
            db_user: String::new(),
            db_password: String::new(),
            db_sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout: 0,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }

    /// Connection settings for the configured engine.
    pub fn database_config(&self) -> DatabaseConfig {
        match self.db_type {
            DatabaseType::SQLite => DatabaseConfig::sqlite(&self.db_sqlite_path),
            backend => DatabaseConfig::server(
                backend,
                &self.db_host,
                self.db_port,
                &self.db_name,
                &self.db_user,
                &self.db_password,
            ),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// `None` when the query timeout is disabled.
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout > 0).then(|| Duration::from_secs(self.query_timeout))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
