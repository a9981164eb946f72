//! Query execution tool.
//!
//! This module implements the `db.query` method for running SELECT statements.
//! The statement is checked by the validator before a connection is requested,
//! so rejected queries never touch the database.

use crate::db::{ConnectionManager, QueryExecutor, dialect_for};
use crate::error::DbResult;
use crate::tools::input::QueryInput;
use crate::tools::validator::validate_select;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

/// Output from `db.query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    /// Statement as executed, including any appended LIMIT
    pub query: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
}

pub struct QueryToolHandler<'a> {
    connection_manager: &'a mut ConnectionManager,
}

impl<'a> QueryToolHandler<'a> {
    /// Create a new query tool handler.
    pub fn new(connection_manager: &'a mut ConnectionManager) -> Self {
        Self { connection_manager }
    }

    /// Handle the query method call.
    pub async fn query(&mut self, input: QueryInput) -> DbResult<QueryOutput> {
        let dialect = dialect_for(self.connection_manager.backend());
        let sql = validate_select(input.query.as_deref().unwrap_or(""), input.limit, dialect)?;

        let executor = QueryExecutor::new(self.connection_manager.query_timeout());
        let conn = self.connection_manager.get_connection().await?;
        let result = executor.execute_select(conn, &sql).await?;

        info!(
            row_count = result.row_count(),
            columns = result.columns.len(),
            "Query executed"
        );

        Ok(QueryOutput {
            query: sql,
            row_count: result.row_count(),
            columns: result.columns,
            rows: result.rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DbError, ValidationError};
    use crate::models::DatabaseConfig;

    fn unreachable_manager() -> ConnectionManager {
        ConnectionManager::new(DatabaseConfig::sqlite("/nonexistent/app.db"))
    }

    #[tokio::test]
    async fn test_missing_query_is_rejected_before_connecting() {
        let mut manager = unreachable_manager();
        let err = QueryToolHandler::new(&mut manager)
            .query(QueryInput::default())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Validation(ValidationError::Empty)));
        assert_eq!(err.to_string(), "Parâmetro \"query\" é obrigatório");
        assert_eq!(manager.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_forbidden_keyword_never_connects() {
        let mut manager = unreachable_manager();
        let input = QueryInput {
            query: Some("SELECT * FROM users; DROP TABLE users".to_string()),
            limit: None,
        };
        let err = QueryToolHandler::new(&mut manager)
            .query(input)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Keyword \"DROP\" não permitido");
        assert_eq!(manager.acquire_count(), 0);
    }

    #[test]
    fn test_query_output_field_order() {
        let output = QueryOutput {
            query: "SELECT 1 AS one".to_string(),
            columns: vec!["one".to_string()],
            row_count: 0,
            rows: Vec::new(),
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.starts_with(r#"{"query":"SELECT 1 AS one","columns":["one"]"#));
    }
}
