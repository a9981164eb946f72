//! Connection-related data models.
//!
//! This module defines the backend selector and the immutable connection settings
//! handed to the gateway core at startup.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Identifier used on the wire (`db_type` fields) and in `DB_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "postgresql",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }

    /// Server engines exposing `information_schema` catalogs.
    pub fn is_catalog_based(&self) -> bool {
        !matches!(self, Self::SQLite)
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DatabaseType {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(Self::PostgreSQL),
            "mysql" | "mariadb" => Ok(Self::MySQL),
            "sqlite" => Ok(Self::SQLite),
            _ => Err(DbError::backend_unsupported(s)),
        }
    }
}

/// Connection settings for the single database behind the gateway.
///
/// Only the fields relevant to `backend` are read: `file_path` for SQLite, the
/// network fields for the server engines.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseType,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub password: String,
    pub file_path: PathBuf,
}

impl DatabaseConfig {
    /// Settings for an SQLite database file.
    pub fn sqlite(file_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: DatabaseType::SQLite,
            host: String::new(),
            port: 0,
            database: String::new(),
            user: String::new(),
            password: String::new(),
            file_path: file_path.into(),
        }
    }

    /// Settings for a PostgreSQL or MySQL server.
    pub fn server(
        backend: DatabaseType,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            file_path: PathBuf::new(),
        }
    }

    /// Name reported in `database` fields: the file path for SQLite, the database name otherwise.
    pub fn display_name(&self) -> String {
        match self.backend {
            DatabaseType::SQLite => self.file_path.display().to_string(),
            _ => self.database.clone(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"****")
            .field("file_path", &self.file_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_str() {
        assert_eq!(
            "postgresql".parse::<DatabaseType>().unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!(
            "Postgres".parse::<DatabaseType>().unwrap(),
            DatabaseType::PostgreSQL
        );
        assert_eq!("mysql".parse::<DatabaseType>().unwrap(), DatabaseType::MySQL);
        assert_eq!(
            "mariadb".parse::<DatabaseType>().unwrap(),
            DatabaseType::MySQL
        );
        assert_eq!(
            " sqlite ".parse::<DatabaseType>().unwrap(),
            DatabaseType::SQLite
        );
    }

    #[test]
    fn test_database_type_unknown_is_unsupported() {
        let err = "oracle".parse::<DatabaseType>().unwrap_err();
        assert!(matches!(err, DbError::BackendUnsupported { .. }));
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn test_database_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(DatabaseType::PostgreSQL).unwrap(),
            "postgresql"
        );
        assert_eq!(DatabaseType::MySQL.as_str(), "mysql");
        assert!(DatabaseType::MySQL.is_catalog_based());
        assert!(!DatabaseType::SQLite.is_catalog_based());
    }

    #[test]
    fn test_debug_masks_password() {
        let config = DatabaseConfig::server(
            DatabaseType::PostgreSQL,
            "localhost",
            5432,
            "app",
            "reader",
            "secret",
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    fn test_display_name_per_backend() {
        let sqlite = DatabaseConfig::sqlite("/tmp/app.db");
        assert_eq!(sqlite.display_name(), "/tmp/app.db");

        let mysql = DatabaseConfig::server(DatabaseType::MySQL, "db", 3306, "sales", "u", "p");
        assert_eq!(mysql.display_name(), "sales");
    }
}
