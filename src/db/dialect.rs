//! Per-engine SQL dialects.
//!
//! Everything that differs textually between the engines lives behind
//! [`SqlDialect`]: catalog queries, placeholder syntax, whether unbounded
//! SELECTs get a row limit appended, and how a record lookup compares its key.
//! Handlers pick a dialect once through [`dialect_for`] and never branch on the
//! backend themselves.

use crate::models::{DatabaseType, QueryParam};

/// Shape of the describe-table catalog query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescribeShape {
    /// `information_schema.columns` filtered by a bound table name.
    Catalog(&'static str),
    /// `PRAGMA table_info(...)` with the table name interpolated.
    Pragma,
}

pub trait SqlDialect: Send + Sync {
    fn backend(&self) -> DatabaseType;

    /// Catalog listing; rows carry `name` and `type` columns in catalog order.
    fn list_tables_sql(&self) -> &'static str;

    fn describe_shape(&self) -> DescribeShape;

    /// Positional placeholder for the `n`th (1-based) bound value.
    fn placeholder(&self, n: usize) -> String;

    /// Whether unbounded SELECTs get ` LIMIT n` appended before execution.
    fn injects_row_limit(&self) -> bool {
        self.backend().is_catalog_based()
    }

    /// Single-row lookup by key. Table and column names are used verbatim.
    fn record_lookup_sql(&self, table: &str, id_column: &str, _id: &QueryParam) -> String {
        format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT 1",
            table,
            id_column,
            self.placeholder(1)
        )
    }
}

pub struct Postgres;
pub struct MySql;
pub struct Sqlite;

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS name, table_type::text AS type
            FROM information_schema.tables
            WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
            ORDER BY table_name
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                column_default::text AS column_default,
                character_maximum_length::bigint AS max_length,
                numeric_precision::bigint AS numeric_precision,
                numeric_scale::bigint AS numeric_scale
            FROM information_schema.columns
            WHERE table_name = $1
            ORDER BY ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT
                CONVERT(TABLE_NAME USING utf8mb4) AS name,
                CONVERT(TABLE_TYPE USING utf8mb4) AS type
            FROM information_schema.tables
            WHERE TABLE_SCHEMA = DATABASE()
            ORDER BY TABLE_NAME
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
            SELECT
                CONVERT(COLUMN_NAME USING utf8mb4) AS column_name,
                CONVERT(DATA_TYPE USING utf8mb4) AS data_type,
                CONVERT(IS_NULLABLE USING utf8mb4) AS is_nullable,
                CONVERT(COLUMN_DEFAULT USING utf8mb4) AS column_default,
                CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
                CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
                CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale
            FROM information_schema.columns
            WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
            ORDER BY ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name, 'table' AS type FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;
    }
}

impl SqlDialect for Postgres {
    fn backend(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn list_tables_sql(&self) -> &'static str {
        queries::postgres::LIST_TABLES
    }

    fn describe_shape(&self) -> DescribeShape {
        DescribeShape::Catalog(queries::postgres::DESCRIBE_COLUMNS)
    }

    fn placeholder(&self, n: usize) -> String {
        format!("${}", n)
    }

    /// Text keys are compared against the column's text form so that a string id
    /// still matches integer and uuid keys.
    fn record_lookup_sql(&self, table: &str, id_column: &str, id: &QueryParam) -> String {
        let column = if id.is_text() {
            format!("{}::text", id_column)
        } else {
            id_column.to_string()
        };
        format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT 1",
            table,
            column,
            self.placeholder(1)
        )
    }
}

impl SqlDialect for MySql {
    fn backend(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    fn list_tables_sql(&self) -> &'static str {
        queries::mysql::LIST_TABLES
    }

    fn describe_shape(&self) -> DescribeShape {
        DescribeShape::Catalog(queries::mysql::DESCRIBE_COLUMNS)
    }

    fn placeholder(&self, _n: usize) -> String {
        "?".to_string()
    }
}

impl SqlDialect for Sqlite {
    fn backend(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn list_tables_sql(&self) -> &'static str {
        queries::sqlite::LIST_TABLES
    }

    fn describe_shape(&self) -> DescribeShape {
        DescribeShape::Pragma
    }

    fn placeholder(&self, _n: usize) -> String {
        "?".to_string()
    }
}

/// Select the dialect for a backend.
pub fn dialect_for(backend: DatabaseType) -> &'static dyn SqlDialect {
    match backend {
        DatabaseType::PostgreSQL => &Postgres,
        DatabaseType::MySQL => &MySql,
        DatabaseType::SQLite => &Sqlite,
    }
}

/// `PRAGMA table_info` statement for a table, quoting the name as a string literal.
pub fn pragma_table_info(table: &str) -> String {
    format!("PRAGMA table_info('{}')", table.replace('\'', "''"))
}
