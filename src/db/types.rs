//! Column value decoding.
//!
//! Rows come back from three different drivers, in the text protocol for raw
//! SELECTs and the binary protocol for bound lookups. This module turns every
//! cell into one canonical JSON encoding:
//!
//! - integers and floats become JSON numbers (non-finite floats become strings)
//! - DECIMAL/NUMERIC become strings carrying the exact database representation
//! - dates and times become ISO-8601 strings
//! - JSON columns are embedded as JSON
//! - binary data is UTF-8 text when valid, base64 otherwise
//! - anything else is returned as text, or null when it cannot be decoded
//!
//! # Architecture
//!
//! `TypeCategory` classifies the server engines' column types; the
//! database-specific decoder modules do the value extraction. SQLite is dynamically
//! typed, so its decoder uses each value's runtime storage class instead.

use crate::models::DatabaseType;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::error::BoxDynError;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};
use std::fmt::Write as _;

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    /// Timestamp without time zone
    DateTime,
    /// Timestamp normalized to UTC by the server
    DateTimeUtc,
    Unknown,
}

/// Classify a server column type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let upper = type_name.to_uppercase();

    // Arrays are returned in their textual form
    if upper.ends_with("[]") {
        return TypeCategory::Unknown;
    }

    let base = upper.trim_end_matches(" UNSIGNED");
    match base {
        "INT2" | "INT4" | "INT8" | "SMALLINT" | "INT" | "INTEGER" | "BIGINT" | "TINYINT"
        | "MEDIUMINT" | "OID" => TypeCategory::Integer,
        "FLOAT4" | "FLOAT8" | "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" => {
            TypeCategory::Float
        }
        "NUMERIC" | "DECIMAL" => TypeCategory::Decimal,
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "BYTEA" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            TypeCategory::Binary
        }
        "JSON" | "JSONB" => TypeCategory::Json,
        "UUID" => TypeCategory::Uuid,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "DATETIME" => TypeCategory::DateTime,
        // MySQL converts TIMESTAMP values to UTC; Postgres TIMESTAMP carries no zone
        "TIMESTAMP" if db == DatabaseType::MySQL => TypeCategory::DateTimeUtc,
        "TIMESTAMP" => TypeCategory::DateTime,
        "TIMESTAMPTZ" => TypeCategory::DateTimeUtc,
        _ => TypeCategory::Unknown,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, BoxDynError> {
        // Both MySQL protocols transfer DECIMAL as text
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        <String as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => Ok(RawDecimal(pg_numeric_to_string(value.as_bytes()?)?)),
        }
    }
}

/// Render a binary-format Postgres NUMERIC.
///
/// Layout: ndigits, weight, sign, dscale (all 16-bit big endian), followed by
/// `ndigits` base-10000 digits. `weight` is the power of 10000 of the first digit.
fn pg_numeric_to_string(bytes: &[u8]) -> Result<String, BoxDynError> {
    const NEGATIVE: u16 = 0x4000;
    const NAN: u16 = 0xC000;
    const POS_INFINITY: u16 = 0xD000;
    const NEG_INFINITY: u16 = 0xF000;

    if bytes.len() < 8 {
        return Err("numeric value too short".into());
    }
    let word = |i: usize| u16::from_be_bytes([bytes[i], bytes[i + 1]]);

    let ndigits = word(0) as usize;
    let weight = word(2) as i16 as i32;
    let sign = word(4);
    let dscale = word(6) as usize;

    match sign {
        NAN => return Ok("NaN".to_string()),
        POS_INFINITY => return Ok("Infinity".to_string()),
        NEG_INFINITY => return Ok("-Infinity".to_string()),
        _ => {}
    }

    if bytes.len() < 8 + ndigits * 2 {
        return Err("numeric digits truncated".into());
    }
    let digits: Vec<u16> = (0..ndigits).map(|i| word(8 + i * 2)).collect();
    let digit_at = |pos: i32| -> u16 {
        usize::try_from(pos)
            .ok()
            .and_then(|p| digits.get(p).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NEGATIVE {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for pos in 0..=weight {
            if pos == 0 {
                write!(out, "{}", digit_at(pos))?;
            } else {
                write!(out, "{:04}", digit_at(pos))?;
            }
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut pos = weight + 1;
        while frac.len() < dscale {
            write!(frac, "{:04}", digit_at(pos))?;
            pos += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }

    Ok(out)
}

// =============================================================================
// Shared Encoders
// =============================================================================

/// Binary data as UTF-8 text when valid, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn date_value(v: NaiveDate) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%d").to_string())
}

fn time_value(v: NaiveTime) -> JsonValue {
    JsonValue::String(v.format("%H:%M:%S%.f").to_string())
}

fn datetime_value(v: NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn datetime_utc_value(v: DateTime<Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

/// Parse text as JSON when the declared type says so, else keep it as a string.
fn text_value(text: String, declared_type: &str) -> JsonValue {
    if declared_type.to_lowercase().contains("json") {
        if let Ok(json) = serde_json::from_str::<JsonValue>(&text) {
            return json;
        }
    }
    JsonValue::String(text)
}

// =============================================================================
// Row to JSON Trait
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    /// Column name to canonical JSON value, in column order.
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn get_column_names(&self) -> Vec<String>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                let value = mysql::decode_column(self, idx, type_name, category);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn get_column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                let value = postgres::decode_column(self, idx, type_name, category);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn get_column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let declared = col.type_info().name();
                let value = sqlite::decode_column(self, idx, declared);
                (col.name().to_string(), value)
            })
            .collect()
    }

    fn get_column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        if is_null(row, idx) {
            return JsonValue::Null;
        }

        let decoded = match category {
            TypeCategory::Decimal => row
                .try_get::<RawDecimal, _>(idx)
                .ok()
                .map(|v| JsonValue::String(v.0)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok(),
            TypeCategory::Date => row.try_get::<NaiveDate, _>(idx).ok().map(date_value),
            TypeCategory::Time => row.try_get::<NaiveTime, _>(idx).ok().map(time_value),
            TypeCategory::DateTime => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(datetime_value),
            TypeCategory::DateTimeUtc => row
                .try_get::<DateTime<Utc>, _>(idx)
                .ok()
                .map(datetime_utc_value),
            TypeCategory::Uuid | TypeCategory::Unknown => None,
        };

        decoded.unwrap_or_else(|| decode_text(row, idx, type_name))
    }

    fn is_null(row: &MySqlRow, idx: usize) -> bool {
        row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true)
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        row.try_get::<u64, _>(idx)
            .ok()
            .map(|v| JsonValue::Number(v.into()))
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_value(v));
        }
        row.try_get::<f32, _>(idx).ok().map(|v| float_value(v as f64))
    }

    fn decode_text(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get_unchecked::<String, _>(idx) {
            Ok(v) => text_value(v, type_name),
            Err(e) => {
                tracing::debug!(column = idx, type_name, error = %e, "Undecodable MySQL value");
                JsonValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> JsonValue {
        if is_null(row, idx) {
            return JsonValue::Null;
        }

        let decoded = match category {
            TypeCategory::Decimal => match row.try_get::<RawDecimal, _>(idx) {
                Ok(v) => Some(JsonValue::String(v.0)),
                Err(e) => {
                    tracing::error!("Failed to decode NUMERIC: {:?}", e);
                    None
                }
            },
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| decode_binary_value(&v)),
            TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok(),
            TypeCategory::Uuid => row
                .try_get::<sqlx::types::Uuid, _>(idx)
                .ok()
                .map(|v| JsonValue::String(v.to_string())),
            TypeCategory::Date => row.try_get::<NaiveDate, _>(idx).ok().map(date_value),
            TypeCategory::Time => row.try_get::<NaiveTime, _>(idx).ok().map(time_value),
            TypeCategory::DateTime => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(datetime_value),
            TypeCategory::DateTimeUtc => row
                .try_get::<DateTime<Utc>, _>(idx)
                .ok()
                .map(datetime_utc_value),
            TypeCategory::Unknown => None,
        };

        decoded.unwrap_or_else(|| decode_text(row, idx, type_name))
    }

    fn is_null(row: &PgRow, idx: usize) -> bool {
        row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true)
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(JsonValue::Number(v.into()));
        }
        // OID
        row.try_get::<sqlx::postgres::types::Oid, _>(idx)
            .ok()
            .map(|v| JsonValue::Number(v.0.into()))
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<JsonValue> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_value(v));
        }
        row.try_get::<f32, _>(idx).ok().map(|v| float_value(v as f64))
    }

    fn decode_text(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match row.try_get_unchecked::<String, _>(idx) {
            Ok(v) => text_value(v, type_name),
            Err(e) => {
                tracing::debug!(column = idx, type_name, error = %e, "Undecodable Postgres value");
                JsonValue::Null
            }
        }
    }
}

mod sqlite {
    use super::*;

    /// Storage class of the value actually stored in this cell.
    fn storage_class(row: &SqliteRow, idx: usize) -> Option<String> {
        let raw = row.try_get_raw(idx).ok()?;
        if raw.is_null() {
            return None;
        }
        Some(raw.type_info().name().to_string())
    }

    pub fn decode_column(row: &SqliteRow, idx: usize, declared_type: &str) -> JsonValue {
        let Some(storage) = storage_class(row, idx) else {
            return JsonValue::Null;
        };

        let decoded = match storage.as_str() {
            "INTEGER" => row
                .try_get_unchecked::<i64, _>(idx)
                .map(|v| JsonValue::Number(v.into())),
            "REAL" => row.try_get_unchecked::<f64, _>(idx).map(float_value),
            "BLOB" => row
                .try_get_unchecked::<Vec<u8>, _>(idx)
                .map(|v| decode_binary_value(&v)),
            _ => row
                .try_get_unchecked::<String, _>(idx)
                .map(|v| text_value(v, declared_type)),
        };

        decoded.unwrap_or_else(|e| {
            tracing::debug!(column = idx, storage = %storage, error = %e, "Undecodable SQLite value");
            JsonValue::Null
        })
    }
}
