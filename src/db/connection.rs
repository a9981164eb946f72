//! Connection management.
//!
//! The gateway serves one client per process, so instead of a pool it holds a
//! single database-specific connection (PgConnection, MySqlConnection,
//! SqliteConnection). The connection is opened lazily on first use, reused for
//! every later request and closed once at shutdown.
//!
//! Every session is opened read-only: SQLite files in read-only mode, Postgres
//! with `default_transaction_read_only`, MySQL with a read-only session
//! transaction mode.

use crate::error::{DbError, DbResult};
use crate::models::{DatabaseConfig, DatabaseType};
use sqlx::{Connection, Executor};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Default time allowed for establishing the connection.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const MYSQL_READ_ONLY_SESSION: &str = "SET SESSION TRANSACTION READ ONLY";

/// Database-specific live connection.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Open a connection from the gateway settings.
    pub async fn connect(config: &DatabaseConfig) -> DbResult<Self> {
        let backend = config.backend;
        let map_err = |e: sqlx::Error| {
            DbError::connection(
                format!("Failed to connect: {}", e),
                connection_suggestion(backend, &e),
            )
        };

        match backend {
            DatabaseType::MySQL => {
                let options = mysql_options(config);
                let mut conn = MySqlConnection::connect_with(&options)
                    .await
                    .map_err(map_err)?;
                if let Err(e) = (&mut conn).execute(MYSQL_READ_ONLY_SESSION).await {
                    warn!(error = %e, "Could not mark MySQL session read-only");
                }
                Ok(DbConnection::MySql(conn))
            }
            DatabaseType::PostgreSQL => {
                let options = postgres_options(config);
                let conn = PgConnection::connect_with(&options)
                    .await
                    .map_err(map_err)?;
                Ok(DbConnection::Postgres(conn))
            }
            DatabaseType::SQLite => {
                let options = sqlite_options(config);
                let conn = SqliteConnection::connect_with(&options)
                    .await
                    .map_err(map_err)?;
                Ok(DbConnection::SQLite(conn))
            }
        }
    }

    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Query the engine version string, if the engine reports one.
    pub async fn server_version(&mut self) -> Option<String> {
        let result = impl_db_dispatch!(self, {
            MySql(c) => sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(c).await,
            Postgres(c) => sqlx::query_scalar::<_, String>("SELECT version()").fetch_one(c).await,
            SQLite(c) => sqlx::query_scalar::<_, String>("SELECT sqlite_version()").fetch_one(c).await,
        });

        match result {
            Ok(version) => Some(version),
            Err(e) => {
                warn!(error = %e, "Failed to get server version");
                None
            }
        }
    }

    /// Gracefully terminate the connection.
    pub async fn close(self) -> DbResult<()> {
        impl_db_dispatch!(self, {
            MySql(c) => c.close().await?,
            Postgres(c) => c.close().await?,
            SQLite(c) => c.close().await?,
        });
        Ok(())
    }
}

fn mysql_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .charset("utf8mb4");
    if !config.user.is_empty() {
        options = options.username(&config.user);
    }
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if !config.database.is_empty() {
        options = options.database(&config.database);
    }
    options
}

fn postgres_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .application_name("db-gateway")
        .options([("default_transaction_read_only", "on")]);
    if !config.user.is_empty() {
        options = options.username(&config.user);
    }
    if !config.password.is_empty() {
        options = options.password(&config.password);
    }
    if !config.database.is_empty() {
        options = options.database(&config.database);
    }
    options
}

/// The file is opened read-only and must already exist.
fn sqlite_options(config: &DatabaseConfig) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(&config.file_path)
        .read_only(true)
        .create_if_missing(false)
}

/// Generate a helpful suggestion for connection errors.
fn connection_suggestion(db_type: DatabaseType, error: &sqlx::Error) -> String {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") {
        return format!(
            "Check that the {} server is running and reachable at DB_HOST:DB_PORT",
            db_type
        );
    }

    if error_str.contains("authentication") || error_str.contains("password") {
        return "Verify DB_USER and DB_PASSWORD".to_string();
    }

    if error_str.contains("does not exist") || error_str.contains("unknown database") {
        return "Check that DB_NAME names an existing database".to_string();
    }

    if error_str.contains("tls") || error_str.contains("ssl") {
        return "Check TLS/SSL configuration or try disabling it".to_string();
    }

    match db_type {
        DatabaseType::SQLite => {
            "Verify that DB_SQLITE_PATH points to an existing, readable file".to_string()
        }
        _ => format!(
            "Verify DB_HOST, DB_PORT and DB_NAME for the {} server",
            db_type
        ),
    }
}

/// Owns the single connection of a gateway session.
///
/// A failed connect is not cached: the next caller simply tries again. A
/// connection that breaks after being established stays in place and its
/// errors surface through the requests that use it.
#[derive(Debug)]
pub struct ConnectionManager {
    config: DatabaseConfig,
    connect_timeout: Duration,
    query_timeout: Option<Duration>,
    connection: Option<DbConnection>,
    acquisitions: u64,
}

impl ConnectionManager {
    /// Create a manager; nothing is opened until the first request needs it.
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            query_timeout: None,
            connection: None,
            acquisitions: 0,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Bound every statement by `query_timeout`; `None` waits indefinitely.
    pub fn with_query_timeout(mut self, query_timeout: Option<Duration>) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn backend(&self) -> DatabaseType {
        self.config.backend
    }

    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout
    }

    /// Number of times a handler asked for the connection.
    pub fn acquire_count(&self) -> u64 {
        self.acquisitions
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Return the cached connection, opening it first if needed.
    pub async fn get_connection(&mut self) -> DbResult<&mut DbConnection> {
        self.acquisitions += 1;

        if self.connection.is_none() {
            let conn = self.open().await?;
            self.connection = Some(conn);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| DbError::internal("Connection missing after connect"))
    }

    async fn open(&self) -> DbResult<DbConnection> {
        let backend = self.config.backend;
        let database = self.config.display_name();

        info!(
            backend = %backend,
            database = %database,
            "Connecting to database"
        );

        let mut conn = match timeout(self.connect_timeout, DbConnection::connect(&self.config))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(DbError::connection(
                    format!(
                        "Timed out after {}s connecting to {}",
                        self.connect_timeout.as_secs(),
                        backend
                    ),
                    connection_suggestion_for_timeout(backend),
                ));
            }
        };

        let server_version = conn.server_version().await;
        info!(
            backend = %backend,
            database = %database,
            server_version = server_version.as_deref().unwrap_or("unknown"),
            "Connected to database"
        );

        Ok(conn)
    }

    /// Release the connection if one is open. Safe to call repeatedly.
    pub async fn close(&mut self) {
        let Some(conn) = self.connection.take() else {
            debug!("No open connection to close");
            return;
        };

        let backend = conn.db_type();
        match conn.close().await {
            Ok(()) => info!(backend = %backend, "Disconnected from database"),
            Err(e) => warn!(backend = %backend, error = %e, "Error while closing connection"),
        }
    }
}

fn connection_suggestion_for_timeout(db_type: DatabaseType) -> String {
    match db_type {
        DatabaseType::SQLite => "Check that the database file is not locked".to_string(),
        _ => format!(
            "Check network connectivity to the {} server or raise DB_CONNECT_TIMEOUT",
            db_type
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_starts_disconnected() {
        let manager = ConnectionManager::new(DatabaseConfig::sqlite("/nonexistent/app.db"));
        assert!(!manager.is_connected());
        assert_eq!(manager.acquire_count(), 0);
        assert_eq!(manager.backend(), DatabaseType::SQLite);
        assert!(manager.query_timeout().is_none());
    }

    #[tokio::test]
    async fn test_missing_sqlite_file_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let mut manager = ConnectionManager::new(DatabaseConfig::sqlite(&path));

        let err = manager.get_connection().await.unwrap_err();
        assert!(matches!(err, DbError::Connection { .. }));
        assert!(err.is_retryable());
        assert!(!path.exists(), "read-only open must not create the file");

        // Failures are not cached; the next call tries again.
        assert!(manager.get_connection().await.is_err());
        assert_eq!(manager.acquire_count(), 2);
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_connection_is_reused_and_close_is_idempotent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut manager = ConnectionManager::new(DatabaseConfig::sqlite(file.path()));

        let first = manager.get_connection().await.unwrap();
        assert_eq!(first.db_type(), DatabaseType::SQLite);
        manager.get_connection().await.unwrap();
        assert!(manager.is_connected());
        assert_eq!(manager.acquire_count(), 2);

        manager.close().await;
        assert!(!manager.is_connected());
        manager.close().await;
    }

    #[test]
    fn test_connection_suggestion_for_refused() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "Connection refused",
        ));
        let suggestion = connection_suggestion(DatabaseType::PostgreSQL, &err);
        assert!(suggestion.contains("PostgreSQL"));

        let err = sqlx::Error::Configuration("password authentication failed".into());
        let suggestion = connection_suggestion(DatabaseType::MySQL, &err);
        assert!(suggestion.contains("DB_PASSWORD"));
    }
}
