//! Integration tests for query validation.
//!
//! These tests verify that the validator only lets SELECT statements through,
//! and that row limits are applied per engine.

use db_gateway::db::dialect_for;
use db_gateway::error::{DbError, ValidationError};
use db_gateway::models::DatabaseType;
use db_gateway::tools::validator::{FORBIDDEN_KEYWORDS, validate_select};

const ALL_BACKENDS: [DatabaseType; 3] = [
    DatabaseType::PostgreSQL,
    DatabaseType::MySQL,
    DatabaseType::SQLite,
];

/// Test that write statements are rejected on every engine.
#[test]
fn test_write_statements_rejected() {
    let statements = [
        "INSERT INTO users (name) VALUES ('test')",
        "UPDATE users SET name = 'changed' WHERE id = 1",
        "DELETE FROM users WHERE id = 1",
        "DROP TABLE users",
        "ALTER TABLE users ADD COLUMN age INT",
        "TRUNCATE users",
        "CREATE TABLE t (id INT)",
        "PRAGMA writable_schema = ON",
    ];

    for backend in ALL_BACKENDS {
        for sql in statements {
            let result = validate_select(sql, None, dialect_for(backend));
            assert_eq!(
                result,
                Err(ValidationError::NotSelect),
                "{} should be rejected on {}",
                sql,
                backend
            );
        }
    }
}

/// Test that every forbidden keyword is caught inside a SELECT.
#[test]
fn test_forbidden_keywords_inside_select() {
    for keyword in FORBIDDEN_KEYWORDS {
        let sql = format!("SELECT 1; {} something", keyword.to_lowercase());
        for backend in ALL_BACKENDS {
            assert_eq!(
                validate_select(&sql, None, dialect_for(backend)),
                Err(ValidationError::ForbiddenKeyword(keyword)),
                "{:?} on {}",
                sql,
                backend
            );
        }
    }
}

/// Test that rejections render the messages clients match on.
#[test]
fn test_rejection_messages() {
    let postgres = dialect_for(DatabaseType::PostgreSQL);

    let err: DbError = validate_select("", None, postgres).unwrap_err().into();
    assert_eq!(err.to_string(), "Parâmetro \"query\" é obrigatório");

    let err: DbError = validate_select("EXPLAIN SELECT 1", None, postgres)
        .unwrap_err()
        .into();
    assert_eq!(err.to_string(), "Apenas queries SELECT são permitidas");

    let err: DbError = validate_select("SELECT 1; TRUNCATE logs", None, postgres)
        .unwrap_err()
        .into();
    assert_eq!(err.to_string(), "Keyword \"TRUNCATE\" não permitido");
    assert!(err.is_rejection());
}

/// Test the documented over-rejection of identifiers containing keywords.
#[test]
fn test_keyword_substrings_are_rejected() {
    let sqlite = dialect_for(DatabaseType::SQLite);
    for sql in [
        "SELECT updated_at FROM users",
        "SELECT * FROM deleted_items",
        "SELECT dropoff_point FROM rides",
        "SELECT * FROM inserts_log",
    ] {
        assert!(
            matches!(
                validate_select(sql, None, sqlite),
                Err(ValidationError::ForbiddenKeyword(_))
            ),
            "{} should be rejected",
            sql
        );
    }
}

/// Test that a plain SELECT is bounded on catalog engines.
#[test]
fn test_limit_appended_on_catalog_engines() {
    for backend in [DatabaseType::PostgreSQL, DatabaseType::MySQL] {
        let dialect = dialect_for(backend);
        assert_eq!(
            validate_select("SELECT * FROM users", None, dialect).unwrap(),
            "SELECT * FROM users LIMIT 100"
        );
        assert_eq!(
            validate_select("SELECT * FROM users", Some(25), dialect).unwrap(),
            "SELECT * FROM users LIMIT 25"
        );
        assert_eq!(
            validate_select("SELECT * FROM users", Some(1001), dialect).unwrap(),
            "SELECT * FROM users LIMIT 1000"
        );
    }
}

/// Test that a zero limit is appended as given.
#[test]
fn test_zero_limit_is_kept() {
    for backend in [DatabaseType::PostgreSQL, DatabaseType::MySQL] {
        let dialect = dialect_for(backend);
        assert_eq!(
            validate_select("SELECT * FROM users", Some(0), dialect).unwrap(),
            "SELECT * FROM users LIMIT 0"
        );
    }
}

/// Test that any LIMIT text, even in a subquery, suppresses the appended clause.
#[test]
fn test_limit_anywhere_suppresses_injection() {
    let mysql = dialect_for(DatabaseType::MySQL);
    let sql = "SELECT * FROM (SELECT * FROM users LIMIT 5) AS u";
    assert_eq!(validate_select(sql, Some(10), mysql).unwrap(), sql);
}
