//! SQL statement validation for the `db.query` method.
//!
//! The gate is textual: the statement must start with `SELECT` and must not
//! contain any write keyword anywhere in its text. Keyword matching is a plain
//! substring check, so a column named `updated_at` is rejected too. Sessions are
//! additionally opened read-only by the connection manager.

use crate::db::SqlDialect;
use crate::error::ValidationError;
use crate::models::effective_limit;

/// Write keywords, checked in this order; the first hit is reported.
pub const FORBIDDEN_KEYWORDS: [&str; 6] =
    ["DELETE", "UPDATE", "INSERT", "DROP", "ALTER", "TRUNCATE"];

/// Validate a SELECT and return the text to execute.
///
/// The result is the trimmed statement. When the dialect bounds result sets and
/// the statement has no `LIMIT` of its own, ` LIMIT n` is appended with
/// `n = min(requested, MAX_ROW_LIMIT)`, defaulting to `DEFAULT_ROW_LIMIT`.
///
/// # Examples
///
/// ```
/// use db_gateway::db::dialect_for;
/// use db_gateway::models::DatabaseType;
/// use db_gateway::tools::validator::validate_select;
///
/// let postgres = dialect_for(DatabaseType::PostgreSQL);
/// assert_eq!(
///     validate_select("SELECT * FROM users", None, postgres).unwrap(),
///     "SELECT * FROM users LIMIT 100"
/// );
/// assert!(validate_select("DELETE FROM users", None, postgres).is_err());
/// ```
pub fn validate_select(
    raw: &str,
    requested_limit: Option<u32>,
    dialect: &dyn SqlDialect,
) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }

    let upper = trimmed.to_uppercase();
    if !upper.starts_with("SELECT") {
        return Err(ValidationError::NotSelect);
    }

    if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| upper.contains(**k)) {
        return Err(ValidationError::ForbiddenKeyword(*keyword));
    }

    if dialect.injects_row_limit() && !upper.contains("LIMIT") {
        // A trailing terminator would end up in front of the clause
        let statement = trimmed.trim_end_matches(';').trim_end();
        return Ok(format!(
            "{} LIMIT {}",
            statement,
            effective_limit(requested_limit)
        ));
    }

    Ok(trimmed.to_string())
}
