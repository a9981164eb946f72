//! Typed method parameters.
//!
//! Each method deserializes its `params` object into one of these structs.
//! Required fields are `Option`s so that an absent parameter is reported as a
//! missing parameter by the handler, while a parameter of the wrong JSON type is
//! rejected here as invalid input.

use crate::error::{DbError, DbResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

/// Parameters of `db.describe_table`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DescribeTableInput {
    #[serde(default)]
    pub table: Option<String>,
}

/// Parameters of `db.query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryInput {
    /// SELECT statement to run
    #[serde(default)]
    pub query: Option<String>,
    /// Rows to return when no LIMIT is present. Default: 100, max: 1000
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Parameters of `db.get_record`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetRecordInput {
    #[serde(default)]
    pub table: Option<String>,
    /// Key value; JSON null counts as absent
    #[serde(default)]
    pub id: Option<JsonValue>,
    /// Key column. Default: "id"
    #[serde(default)]
    pub id_column: Option<String>,
}

/// Deserialize a method's parameter object; absent params behave like `{}`.
pub fn parse_input<T: DeserializeOwned>(params: Option<&Map<String, JsonValue>>) -> DbResult<T> {
    let value = JsonValue::Object(params.cloned().unwrap_or_default());
    serde_json::from_value(value).map_err(|e| DbError::invalid_input(e.to_string()))
}

/// Treat absent and empty strings alike.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
