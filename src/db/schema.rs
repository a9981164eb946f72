//! Schema introspection module.
//!
//! This module provides catalog introspection for SQLite, PostgreSQL, and MySQL
//! databases. The SQL comes from the backend's [`SqlDialect`]; the
//! database-specific submodules (postgres, mysql, sqlite) read the catalog rows
//! into backend-neutral descriptors, each providing the same interface.
//!
//! [`SqlDialect`]: crate::db::dialect::SqlDialect

use crate::db::connection::DbConnection;
use crate::db::dialect::{DescribeShape, dialect_for, pragma_table_info};
use crate::error::DbResult;
use crate::models::{ColumnDescriptor, TableDescriptor};
use sqlx::Row;
use std::borrow::Cow;
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List user tables in catalog order.
    pub async fn list_tables(conn: &mut DbConnection) -> DbResult<Vec<TableDescriptor>> {
        let sql = dialect_for(conn.db_type()).list_tables_sql();
        let tables = impl_db_dispatch!(conn, {
            MySql(c) => mysql::list_tables(c, sql).await?,
            Postgres(c) => postgres::list_tables(c, sql).await?,
            SQLite(c) => sqlite::list_tables(c, sql).await?,
        });
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Describe a table's columns in ordinal order.
    ///
    /// An unknown table yields an empty column list rather than an error.
    pub async fn describe_table(
        conn: &mut DbConnection,
        table_name: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let shape = dialect_for(conn.db_type()).describe_shape();
        let statement = DescribeStatement::new(shape, table_name);
        let columns = impl_db_dispatch!(conn, {
            MySql(c) => mysql::describe_table(c, &statement).await?,
            Postgres(c) => postgres::describe_table(c, &statement).await?,
            SQLite(c) => sqlite::describe_table(c, &statement).await?,
        });
        debug!(table = %table_name, columns = columns.len(), "Described table");
        Ok(columns)
    }
}

/// Describe-table SQL plus the table name to bind, if the shape binds it.
struct DescribeStatement<'a> {
    sql: Cow<'static, str>,
    table_bind: Option<&'a str>,
}

impl<'a> DescribeStatement<'a> {
    fn new(shape: DescribeShape, table_name: &'a str) -> Self {
        match shape {
            DescribeShape::Catalog(sql) => Self {
                sql: Cow::Borrowed(sql),
                table_bind: Some(table_name),
            },
            DescribeShape::Pragma => Self {
                sql: Cow::Owned(pragma_table_info(table_name)),
                table_bind: None,
            },
        }
    }
}

/// Catalog `is_nullable` is the text "YES" or "NO".
fn catalog_nullable(is_nullable: &str) -> bool {
    is_nullable.eq_ignore_ascii_case("YES")
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::postgres::{PgConnection, PgRow};

    pub async fn list_tables(
        conn: &mut PgConnection,
        sql: &str,
    ) -> DbResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter().map(table_from_row).collect()
    }

    fn table_from_row(row: &PgRow) -> DbResult<TableDescriptor> {
        Ok(TableDescriptor::new(
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("type")?,
        ))
    }

    pub async fn describe_table(
        conn: &mut PgConnection,
        statement: &DescribeStatement<'_>,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let mut query = sqlx::query(&statement.sql);
        if let Some(table_name) = statement.table_bind {
            query = query.bind(table_name);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        rows.iter().map(column_from_row).collect()
    }

    fn column_from_row(row: &PgRow) -> DbResult<ColumnDescriptor> {
        let is_nullable: String = row.try_get("is_nullable")?;
        Ok(ColumnDescriptor::new(
            row.try_get::<String, _>("column_name")?,
            row.try_get::<String, _>("data_type")?,
            catalog_nullable(&is_nullable),
        )
        .with_default(row.try_get("column_default")?)
        .with_max_length(row.try_get("max_length")?)
        .with_numeric(
            row.try_get("numeric_precision")?,
            row.try_get("numeric_scale")?,
        ))
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlConnection, MySqlRow};

    pub async fn list_tables(
        conn: &mut MySqlConnection,
        sql: &str,
    ) -> DbResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter().map(table_from_row).collect()
    }

    fn table_from_row(row: &MySqlRow) -> DbResult<TableDescriptor> {
        Ok(TableDescriptor::new(
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("type")?,
        ))
    }

    pub async fn describe_table(
        conn: &mut MySqlConnection,
        statement: &DescribeStatement<'_>,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let mut query = sqlx::query(&statement.sql);
        if let Some(table_name) = statement.table_bind {
            query = query.bind(table_name);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        rows.iter().map(column_from_row).collect()
    }

    fn column_from_row(row: &MySqlRow) -> DbResult<ColumnDescriptor> {
        let is_nullable: String = row.try_get("is_nullable")?;
        Ok(ColumnDescriptor::new(
            row.try_get::<String, _>("column_name")?,
            row.try_get::<String, _>("data_type")?,
            catalog_nullable(&is_nullable),
        )
        .with_default(row.try_get("column_default")?)
        .with_max_length(row.try_get("max_length")?)
        .with_numeric(
            row.try_get("numeric_precision")?,
            row.try_get("numeric_scale")?,
        ))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::{SqliteConnection, SqliteRow};

    pub async fn list_tables(
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> DbResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(sql).fetch_all(&mut *conn).await?;
        rows.iter().map(table_from_row).collect()
    }

    fn table_from_row(row: &SqliteRow) -> DbResult<TableDescriptor> {
        Ok(TableDescriptor::new(
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("type")?,
        ))
    }

    pub async fn describe_table(
        conn: &mut SqliteConnection,
        statement: &DescribeStatement<'_>,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let mut query = sqlx::query(&statement.sql);
        if let Some(table_name) = statement.table_bind {
            query = query.bind(table_name);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        rows.iter().map(column_from_pragma).collect()
    }

    /// Length, precision and scale are not tracked by SQLite.
    fn column_from_pragma(row: &SqliteRow) -> DbResult<ColumnDescriptor> {
        let notnull: i64 = row.try_get("notnull")?;
        Ok(ColumnDescriptor::new(
            row.try_get::<String, _>("name")?,
            row.try_get::<String, _>("type")?,
            notnull == 0,
        )
        .with_default(row.try_get_unchecked::<Option<String>, _>("dflt_value")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_nullable() {
        assert!(catalog_nullable("YES"));
        assert!(catalog_nullable("yes"));
        assert!(!catalog_nullable("NO"));
        assert!(!catalog_nullable(""));
    }
}
