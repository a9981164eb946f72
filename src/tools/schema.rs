//! Schema introspection tools.
//!
//! This module implements the `db.list_tables`, `db.describe_table` and
//! `db.get_schema` methods.

use crate::db::executor::with_timeout;
use crate::db::{ConnectionManager, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, DatabaseType, SchemaSnapshot, TableDescriptor};
use crate::tools::input::{DescribeTableInput, non_empty};
use serde::Serialize;
use tracing::{info, warn};

/// Output from `db.list_tables`.
#[derive(Debug, Clone, Serialize)]
pub struct ListTablesOutput {
    pub database: String,
    pub db_type: DatabaseType,
    pub table_count: usize,
    pub tables: Vec<TableDescriptor>,
}

/// Output from `db.describe_table`.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeTableOutput {
    pub table: String,
    pub column_count: usize,
    pub columns: Vec<ColumnDescriptor>,
}

/// Output from `db.get_schema`.
#[derive(Debug, Clone, Serialize)]
pub struct GetSchemaOutput {
    pub schema: SchemaSnapshot,
}

pub struct SchemaToolHandler<'a> {
    connection_manager: &'a mut ConnectionManager,
}

impl<'a> SchemaToolHandler<'a> {
    pub fn new(connection_manager: &'a mut ConnectionManager) -> Self {
        Self { connection_manager }
    }

    pub async fn list_tables(&mut self) -> DbResult<ListTablesOutput> {
        let database = self.connection_manager.config().display_name();
        let db_type = self.connection_manager.backend();
        let query_timeout = self.connection_manager.query_timeout();

        let conn = self.connection_manager.get_connection().await?;
        let tables =
            with_timeout(query_timeout, "list tables", SchemaInspector::list_tables(conn)).await?;

        info!(
            database = %database,
            count = tables.len(),
            "Listed tables"
        );

        Ok(ListTablesOutput {
            database,
            db_type,
            table_count: tables.len(),
            tables,
        })
    }

    pub async fn describe_table(&mut self, input: DescribeTableInput) -> DbResult<DescribeTableOutput> {
        let table = non_empty(input.table.as_deref())
            .ok_or_else(|| DbError::missing_params(&["table"]))?;
        let query_timeout = self.connection_manager.query_timeout();

        let conn = self.connection_manager.get_connection().await?;
        let columns = with_timeout(
            query_timeout,
            "describe table",
            SchemaInspector::describe_table(conn, table),
        )
        .await?;

        info!(
            table = %table,
            columns = columns.len(),
            "Described table"
        );

        Ok(DescribeTableOutput {
            table: table.to_string(),
            column_count: columns.len(),
            columns,
        })
    }

    /// Describe every listed table. A table that fails to describe is recorded
    /// in the snapshot and does not fail the request.
    pub async fn get_schema(&mut self) -> DbResult<GetSchemaOutput> {
        let database = self.connection_manager.config().display_name();
        let db_type = self.connection_manager.backend();
        let query_timeout = self.connection_manager.query_timeout();

        let conn = self.connection_manager.get_connection().await?;
        let tables =
            with_timeout(query_timeout, "list tables", SchemaInspector::list_tables(conn)).await?;

        let mut parts = Vec::with_capacity(tables.len());
        for table in tables {
            let described = with_timeout(
                query_timeout,
                "describe table",
                SchemaInspector::describe_table(conn, &table.name),
            )
            .await;
            if let Err(e) = &described {
                warn!(table = %table.name, error = %e, "Failed to describe table");
            }
            parts.push((table, described));
        }

        let schema = SchemaSnapshot::from_parts(database, db_type, parts);
        info!(
            database = %schema.database,
            total_tables = schema.total_tables,
            failed = schema.failed_count(),
            "Built schema snapshot"
        );

        Ok(GetSchemaOutput { schema })
    }
}
