//! Method dispatch.
//!
//! `GatewayService` owns the connection manager for the whole session and turns
//! each request into exactly one response envelope. Handler errors never escape:
//! they become `success: false` responses and the session carries on.

use crate::db::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::protocol::envelope::{
    Method, Request, error_envelope, success_envelope, unknown_method_envelope,
};
use crate::tools::{
    QueryToolHandler, RecordToolHandler, SchemaToolHandler, parse_input,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{info, instrument, warn};

pub struct GatewayService {
    connection_manager: ConnectionManager,
}

impl GatewayService {
    pub fn new(connection_manager: ConnectionManager) -> Self {
        Self { connection_manager }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Answer one raw input line.
    pub async fn handle_line(&mut self, line: &str) -> JsonValue {
        match Request::from_line(line) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "Rejected request line");
                error_envelope(&e)
            }
        }
    }

    pub async fn handle_request(&mut self, request: Request) -> JsonValue {
        info!(method = %request.method, "Processing request");

        let Some(method) = Method::from_name(&request.method) else {
            warn!(method = %request.method, "Unknown method");
            return unknown_method_envelope(&request.method);
        };

        match self.dispatch(method, request.params.as_ref()).await {
            Ok(payload) => success_envelope(payload),
            Err(e) if e.is_rejection() => {
                info!(method = %method, error = %e, "Request rejected");
                error_envelope(&e)
            }
            Err(e) => {
                warn!(
                    method = %method,
                    error = %e,
                    retryable = e.is_retryable(),
                    suggestion = e.suggestion().unwrap_or(""),
                    "Request failed"
                );
                error_envelope(&e)
            }
        }
    }

    #[instrument(skip(self, params), fields(method = %method))]
    async fn dispatch(
        &mut self,
        method: Method,
        params: Option<&Map<String, JsonValue>>,
    ) -> DbResult<JsonValue> {
        let manager = &mut self.connection_manager;
        match method {
            Method::ListTables => to_payload(&SchemaToolHandler::new(manager).list_tables().await?),
            Method::DescribeTable => {
                let input = parse_input(params)?;
                to_payload(&SchemaToolHandler::new(manager).describe_table(input).await?)
            }
            Method::Query => {
                let input = parse_input(params)?;
                to_payload(&QueryToolHandler::new(manager).query(input).await?)
            }
            Method::GetRecord => {
                let input = parse_input(params)?;
                to_payload(&RecordToolHandler::new(manager).get_record(input).await?)
            }
            Method::GetSchema => to_payload(&SchemaToolHandler::new(manager).get_schema().await?),
        }
    }

    /// Release the database connection. Safe to call more than once.
    pub async fn close(&mut self) {
        self.connection_manager.close().await;
    }
}

fn to_payload<T: Serialize>(output: &T) -> DbResult<JsonValue> {
    serde_json::to_value(output)
        .map_err(|e| DbError::internal(format!("Failed to serialize response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseConfig;

    fn service() -> GatewayService {
        GatewayService::new(ConnectionManager::new(DatabaseConfig::sqlite(
            "/nonexistent/gateway.db",
        )))
    }

    #[tokio::test]
    async fn test_unknown_method_does_not_connect() {
        let mut service = service();
        let response = service.handle_line(r#"{"method": "db.drop_all"}"#).await;

        assert_eq!(response["success"], false);
        assert_eq!(response["error"], "Método desconhecido: db.drop_all");
        assert_eq!(response["available_methods"].as_array().unwrap().len(), 5);
        assert_eq!(service.manager().acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_decode_error_response() {
        let mut service = service();
        let response = service.handle_line("{\"method\": ").await;

        assert_eq!(response["success"], false);
        assert!(
            response["error"]
                .as_str()
                .unwrap()
                .starts_with("JSON decode error: ")
        );
        assert!(response.get("timestamp").is_none());
    }

    #[tokio::test]
    async fn test_wrong_param_type_is_rejected_before_connecting() {
        let mut service = service();
        let response = service
            .handle_line(r#"{"method": "db.query", "params": {"query": "SELECT 1", "limit": "ten"}}"#)
            .await;

        assert_eq!(response["success"], false);
        assert!(
            response["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid input: ")
        );
        assert_eq!(service.manager().acquire_count(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported() {
        let mut service = service();
        let response = service.handle_line(r#"{"method": "db.list_tables"}"#).await;

        assert_eq!(response["success"], false);
        assert!(
            response["error"]
                .as_str()
                .unwrap()
                .starts_with("Connection failed: ")
        );
        assert_eq!(service.manager().acquire_count(), 1);
        service.close().await;
    }
}
