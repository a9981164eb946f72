//! Single-record lookup tool.
//!
//! This module implements the `db.get_record` method. The key value is bound
//! through the backend's placeholder; the table and key column names are used
//! verbatim in the statement.

use crate::db::{ConnectionManager, JsonRecord, QueryExecutor, dialect_for};
use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use crate::tools::input::{GetRecordInput, non_empty};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::info;

/// Key column used when the request names none.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Output from `db.get_record`.
#[derive(Debug, Clone, Serialize)]
pub struct GetRecordOutput {
    pub table: String,
    /// The key exactly as sent by the client
    pub id: JsonValue,
    pub record: JsonRecord,
}

pub struct RecordToolHandler<'a> {
    connection_manager: &'a mut ConnectionManager,
}

impl<'a> RecordToolHandler<'a> {
    pub fn new(connection_manager: &'a mut ConnectionManager) -> Self {
        Self { connection_manager }
    }

    pub async fn get_record(&mut self, input: GetRecordInput) -> DbResult<GetRecordOutput> {
        let table = non_empty(input.table.as_deref());
        let id_value = input.id.filter(|v| v.as_str() != Some(""));
        let (Some(table), Some(id_value)) = (table, id_value) else {
            return Err(DbError::missing_params(&["table", "id"]));
        };

        let id = QueryParam::from_json(&id_value)?;
        let id_column = non_empty(input.id_column.as_deref()).unwrap_or(DEFAULT_ID_COLUMN);
        let sql = dialect_for(self.connection_manager.backend()).record_lookup_sql(
            table,
            id_column,
            &id,
        );

        let executor = QueryExecutor::new(self.connection_manager.query_timeout());
        let conn = self.connection_manager.get_connection().await?;
        let record = executor
            .fetch_record(conn, &sql, &id)
            .await?
            .ok_or_else(|| DbError::not_found(table, id.to_string()))?;

        info!(table = %table, id_column = %id_column, "Fetched record");

        Ok(GetRecordOutput {
            table: table.to_string(),
            id: id_value,
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseConfig;
    use serde_json::json;

    fn unreachable_manager() -> ConnectionManager {
        ConnectionManager::new(DatabaseConfig::sqlite("/nonexistent/app.db"))
    }

    #[tokio::test]
    async fn test_missing_table_or_id() {
        let mut manager = unreachable_manager();
        let mut handler = RecordToolHandler::new(&mut manager);

        let cases = vec![
            GetRecordInput::default(),
            GetRecordInput {
                table: Some("users".to_string()),
                ..Default::default()
            },
            GetRecordInput {
                id: Some(json!(1)),
                ..Default::default()
            },
            GetRecordInput {
                table: Some("users".to_string()),
                id: Some(json!("")),
                id_column: None,
            },
        ];

        for input in cases {
            let err = handler.get_record(input).await.unwrap_err();
            assert_eq!(
                err.to_string(),
                "Parâmetros \"table\" e \"id\" são obrigatórios"
            );
        }
        assert_eq!(manager.acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_composite_id_is_invalid_input() {
        let mut manager = unreachable_manager();
        let input = GetRecordInput {
            table: Some("users".to_string()),
            id: Some(json!({"id": 1})),
            id_column: None,
        };
        let err = RecordToolHandler::new(&mut manager)
            .get_record(input)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::InvalidInput { .. }));
        assert_eq!(manager.acquire_count(), 0);
    }
}
