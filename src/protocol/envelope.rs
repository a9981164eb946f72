//! Request parsing and response envelopes.
//!
//! A request is one JSON object per line: `{"method": "...", "params": {...}}`.
//! Every response is a JSON object carrying `success`; successful ones also carry
//! an RFC 3339 `timestamp`, failed ones an `error` message.

use crate::error::{DbError, DbResult};
use chrono::Utc;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// The methods a gateway answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ListTables,
    DescribeTable,
    Query,
    GetRecord,
    GetSchema,
}

impl Method {
    /// Every method, in the order they are advertised.
    pub const ALL: [Method; 5] = [
        Method::ListTables,
        Method::DescribeTable,
        Method::Query,
        Method::GetRecord,
        Method::GetSchema,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListTables => "db.list_tables",
            Self::DescribeTable => "db.describe_table",
            Self::Query => "db.query",
            Self::GetRecord => "db.get_record",
            Self::GetSchema => "db.get_schema",
        }
    }

    /// Look up a method by its wire name. Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(Method::as_str).collect()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Method name as sent; empty when absent
    pub method: String,
    pub params: Option<Map<String, JsonValue>>,
}

impl Request {
    /// Decode one input line.
    ///
    /// Malformed JSON and non-object documents are `Decode` errors. A `params`
    /// member that is neither an object nor null is `InvalidInput`.
    pub fn from_line(line: &str) -> DbResult<Self> {
        let value: JsonValue =
            serde_json::from_str(line.trim()).map_err(|e| DbError::decode(e.to_string()))?;

        let JsonValue::Object(mut object) = value else {
            return Err(DbError::decode("expected a JSON object"));
        };

        let method = match object.remove("method") {
            None | Some(JsonValue::Null) => String::new(),
            Some(JsonValue::String(name)) => name,
            Some(other) => other.to_string(),
        };

        let params = match object.remove("params") {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::Object(params)) => Some(params),
            Some(_) => return Err(DbError::invalid_input("\"params\" must be a JSON object")),
        };

        Ok(Self { method, params })
    }
}

/// Wrap a handler payload: `success` first, the payload's fields, then `timestamp`.
pub fn success_envelope(payload: JsonValue) -> JsonValue {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), JsonValue::Bool(true));
    match payload {
        JsonValue::Object(fields) => envelope.extend(fields),
        JsonValue::Null => {}
        other => {
            envelope.insert("result".to_string(), other);
        }
    }
    envelope.insert(
        "timestamp".to_string(),
        JsonValue::String(Utc::now().to_rfc3339()),
    );
    JsonValue::Object(envelope)
}

pub fn error_envelope(error: &DbError) -> JsonValue {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), JsonValue::Bool(false));
    envelope.insert("error".to_string(), JsonValue::String(error.to_string()));
    JsonValue::Object(envelope)
}

/// Failure for a method name nobody answers to, listing the ones that exist.
pub fn unknown_method_envelope(method: &str) -> JsonValue {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), JsonValue::Bool(false));
    envelope.insert(
        "error".to_string(),
        JsonValue::String(format!("Método desconhecido: {}", method)),
    );
    envelope.insert(
        "available_methods".to_string(),
        JsonValue::from(Method::names()),
    );
    JsonValue::Object(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(Method::from_name(method.as_str()), Some(method));
        }
        assert_eq!(Method::from_name("db.drop_table"), None);
        assert_eq!(Method::from_name("DB.QUERY"), None);
        assert_eq!(Method::from_name(""), None);
    }

    #[test]
    fn test_request_from_line() {
        let request =
            Request::from_line(r#"{"method": "db.query", "params": {"query": "SELECT 1"}}"#)
                .unwrap();
        assert_eq!(request.method, "db.query");
        assert_eq!(request.params.unwrap()["query"], "SELECT 1");

        let request = Request::from_line(r#"{"method": "db.list_tables"}"#).unwrap();
        assert!(request.params.is_none());

        let request = Request::from_line(r#"{"params": null}"#).unwrap();
        assert_eq!(request.method, "");
        assert!(request.params.is_none());
    }

    #[test]
    fn test_non_string_method_is_kept_as_text() {
        let request = Request::from_line(r#"{"method": 5}"#).unwrap();
        assert_eq!(request.method, "5");
    }

    #[test]
    fn test_malformed_lines_are_decode_errors() {
        for line in ["{not json", "[1, 2]", "\"db.query\"", "42"] {
            let err = Request::from_line(line).unwrap_err();
            assert!(
                err.to_string().starts_with("JSON decode error: "),
                "line {:?} gave {}",
                line,
                err
            );
        }
    }

    #[test]
    fn test_non_object_params_are_invalid_input() {
        let err = Request::from_line(r#"{"method": "db.query", "params": ["SELECT 1"]}"#)
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInput { .. }));
    }

    #[test]
    fn test_success_envelope_layout() {
        let envelope = success_envelope(json!({"table": "users", "column_count": 2}));
        let keys: Vec<&str> = envelope
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["success", "table", "column_count", "timestamp"]);

        let timestamp = envelope["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_error_envelope() {
        let envelope = error_envelope(&DbError::not_found("users", "999"));
        assert_eq!(
            envelope,
            json!({"success": false, "error": "Registro 999 não encontrado em users"})
        );
    }

    #[test]
    fn test_unknown_method_envelope() {
        let envelope = unknown_method_envelope("db.drop");
        assert_eq!(envelope["success"], false);
        assert_eq!(envelope["error"], "Método desconhecido: db.drop");
        assert_eq!(
            envelope["available_methods"],
            json!([
                "db.list_tables",
                "db.describe_table",
                "db.query",
                "db.get_record",
                "db.get_schema"
            ])
        );
    }
}
