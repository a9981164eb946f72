//! Query execution engine.
//!
//! This module provides query execution functionality with support for:
//! - Raw SELECT text (sent unprepared, so servers reply in their text format)
//! - Single-row lookups with one bound key
//! - Column names for empty results
//! - Optional query timeouts
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific operations
//! - `postgres`: PostgreSQL-specific operations
//! - `sqlite`: SQLite-specific operations
//!
//! Each submodule provides identical functionality adapted to the database's type system.

use crate::db::connection::DbConnection;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{QueryParam, QueryResult};
use futures_util::TryStreamExt;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// A decoded record keyed by column name.
pub type JsonRecord = serde_json::Map<String, JsonValue>;

/// Query executor that handles database query execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExecutor {
    query_timeout: Option<Duration>,
}

impl QueryExecutor {
    /// Create an executor; `None` lets statements run as long as the server allows.
    pub fn new(query_timeout: Option<Duration>) -> Self {
        Self { query_timeout }
    }

    /// Execute SELECT text verbatim and return every row it produces.
    ///
    /// Row bounding is the caller's job (see the query validator).
    pub async fn execute_select(&self, conn: &mut DbConnection, sql: &str) -> DbResult<QueryResult> {
        let start = Instant::now();
        debug!(sql = %sql, "Executing query");

        let result = with_timeout(self.query_timeout, "query execution", async {
            impl_db_dispatch!(conn, {
                MySql(c) => mysql::select(c, sql).await,
                Postgres(c) => postgres::select(c, sql).await,
                SQLite(c) => sqlite::select(c, sql).await,
            })
        })
        .await?;

        debug!(
            rows = result.row_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );
        Ok(result)
    }

    /// Fetch at most one row from a statement with a single placeholder.
    pub async fn fetch_record(
        &self,
        conn: &mut DbConnection,
        sql: &str,
        id: &QueryParam,
    ) -> DbResult<Option<JsonRecord>> {
        debug!(sql = %sql, id_type = id.type_name(), "Fetching record");

        with_timeout(self.query_timeout, "record lookup", async {
            impl_db_dispatch!(conn, {
                MySql(c) => mysql::fetch_record(c, sql, id).await,
                Postgres(c) => postgres::fetch_record(c, sql, id).await,
                SQLite(c) => sqlite::fetch_record(c, sql, id).await,
            })
        })
        .await
    }
}

/// Await `fut`, failing with a timeout error once `limit` elapses.
pub(crate) async fn with_timeout<T, F>(
    limit: Option<Duration>,
    operation: &str,
    fut: F,
) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(DbError::timeout(operation, limit.as_secs())),
        },
    }
}

fn to_result<R: RowToJson>(columns: Vec<String>, rows: &[R]) -> QueryResult {
    QueryResult {
        columns,
        rows: rows.iter().map(|r| r.to_json_map()).collect(),
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
    use sqlx::{Column, Executor};

    pub async fn select(conn: &mut MySqlConnection, sql: &str) -> DbResult<QueryResult> {
        let rows: Vec<MySqlRow> = (&mut *conn).fetch(sql).try_collect().await?;
        let columns = match rows.first() {
            Some(row) => row.get_column_names(),
            None => describe_columns(conn, sql).await,
        };
        Ok(to_result(columns, &rows))
    }

    async fn describe_columns(conn: &mut MySqlConnection, sql: &str) -> Vec<String> {
        match (&mut *conn).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }

    pub async fn fetch_record(
        conn: &mut MySqlConnection,
        sql: &str,
        id: &QueryParam,
    ) -> DbResult<Option<JsonRecord>> {
        let row = bind_param(sqlx::query(sql), id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.to_json_map()))
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::MySql, MySqlArguments> {
        match param {
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::{PgArguments, PgConnection, PgRow};
    use sqlx::{Column, Executor};

    pub async fn select(conn: &mut PgConnection, sql: &str) -> DbResult<QueryResult> {
        let rows: Vec<PgRow> = (&mut *conn).fetch(sql).try_collect().await?;
        let columns = match rows.first() {
            Some(row) => row.get_column_names(),
            None => describe_columns(conn, sql).await,
        };
        Ok(to_result(columns, &rows))
    }

    async fn describe_columns(conn: &mut PgConnection, sql: &str) -> Vec<String> {
        match (&mut *conn).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }

    pub async fn fetch_record(
        conn: &mut PgConnection,
        sql: &str,
        id: &QueryParam,
    ) -> DbResult<Option<JsonRecord>> {
        let row = bind_param(sqlx::query(sql), id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.to_json_map()))
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
        match param {
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
    use sqlx::{Column, Executor};

    pub async fn select(conn: &mut SqliteConnection, sql: &str) -> DbResult<QueryResult> {
        let rows: Vec<SqliteRow> = (&mut *conn).fetch(sql).try_collect().await?;
        let columns = match rows.first() {
            Some(row) => row.get_column_names(),
            None => describe_columns(conn, sql).await,
        };
        Ok(to_result(columns, &rows))
    }

    async fn describe_columns(conn: &mut SqliteConnection, sql: &str) -> Vec<String> {
        match (&mut *conn).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }

    pub async fn fetch_record(
        conn: &mut SqliteConnection,
        sql: &str,
        id: &QueryParam,
    ) -> DbResult<Option<JsonRecord>> {
        let row = bind_param(sqlx::query(sql), id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.map(|r| r.to_json_map()))
    }

    fn bind_param<'q>(
        query: sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>,
        param: &'q QueryParam,
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>> {
        match param {
            QueryParam::Bool(v) => query.bind(*v),
            QueryParam::Int(v) => query.bind(*v),
            QueryParam::Float(v) => query.bind(*v),
            QueryParam::String(v) => query.bind(v.as_str()),
        }
    }
}
