//! Query-related data models.
//!
//! This module defines types for SELECT results and the single bound value used
//! by record lookups.

use crate::error::{DbError, DbResult};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Default row limit appended to unbounded SELECTs.
pub const DEFAULT_ROW_LIMIT: u32 = 100;

/// Maximum allowed row limit.
pub const MAX_ROW_LIMIT: u32 = 1000;

/// Cap a caller-requested limit at `MAX_ROW_LIMIT`. Zero is passed through.
pub fn effective_limit(requested: Option<u32>) -> u32 {
    requested
        .map(|l| l.min(MAX_ROW_LIMIT))
        .unwrap_or(DEFAULT_ROW_LIMIT)
}

/// A parameter value bound into a backend placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    String(String),
}

impl QueryParam {
    /// Convert a JSON scalar into a bindable parameter.
    ///
    /// Objects and arrays cannot identify a row and are rejected.
    pub fn from_json(value: &JsonValue) -> DbResult<Self> {
        match value {
            JsonValue::Bool(v) => Ok(Self::Bool(*v)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float(f))
                } else {
                    Err(DbError::invalid_input(format!("number out of range: {}", n)))
                }
            }
            JsonValue::String(s) => Ok(Self::String(s.clone())),
            JsonValue::Null => Err(DbError::invalid_input("null is not a valid identifier")),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(DbError::invalid_input(
                "\"id\" must be a string, number or boolean",
            )),
        }
    }

    /// Get the type name of this parameter for debugging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::String(_))
    }
}

impl std::fmt::Display for QueryParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// Rows returned by a SELECT, in result order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, JsonValue>>,
}

impl QueryResult {
    /// Get the number of rows in the result.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
