//! Schema-related data models.
//!
//! This module defines the backend-neutral shapes produced by catalog introspection.

use crate::error::DbResult;
use crate::models::DatabaseType;
use serde::{Deserialize, Serialize, Serializer};

/// One row of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    /// "BASE TABLE", "VIEW", ... on catalog engines; always "table" on SQLite
    #[serde(rename = "type")]
    pub kind: String,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// Column definition normalized across backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    /// Default expression as reported by the catalog (unevaluated)
    #[serde(rename = "default")]
    pub default_expr: Option<String>,
    pub max_length: Option<i64>,
    pub numeric_precision: Option<i64>,
    pub numeric_scale: Option<i64>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            default_expr: None,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn with_default(mut self, default_expr: Option<String>) -> Self {
        self.default_expr = default_expr;
        self
    }

    /// Set the character length limit.
    pub fn with_max_length(mut self, max_length: Option<i64>) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set numeric precision and scale.
    pub fn with_numeric(mut self, precision: Option<i64>, scale: Option<i64>) -> Self {
        self.numeric_precision = precision;
        self.numeric_scale = scale;
        self
    }
}

/// Entry for one table inside a [`SchemaSnapshot`].
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TableEntry {
    Described {
        #[serde(rename = "type")]
        kind: String,
        columns: Vec<ColumnDescriptor>,
        column_count: usize,
    },
    /// Describe failed for this table; the rest of the snapshot is unaffected.
    Failed { error: String },
}

impl TableEntry {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Full schema dump assembled from a listing plus one describe per table.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaSnapshot {
    pub database: String,
    pub db_type: DatabaseType,
    pub total_tables: usize,
    /// Keyed by table name, in catalog listing order
    #[serde(serialize_with = "serialize_in_order")]
    pub tables: Vec<(String, TableEntry)>,
}

fn serialize_in_order<S: Serializer>(
    tables: &[(String, TableEntry)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(tables.iter().map(|(name, entry)| (name, entry)))
}

impl SchemaSnapshot {
    /// Assemble a snapshot from per-table describe outcomes.
    ///
    /// A failed describe is stored inline under that table's name.
    pub fn from_parts(
        database: impl Into<String>,
        db_type: DatabaseType,
        parts: Vec<(TableDescriptor, DbResult<Vec<ColumnDescriptor>>)>,
    ) -> Self {
        let total_tables = parts.len();
        let tables = parts
            .into_iter()
            .map(|(table, described)| {
                let entry = match described {
                    Ok(columns) => TableEntry::Described {
                        kind: table.kind,
                        column_count: columns.len(),
                        columns,
                    },
                    Err(e) => TableEntry::Failed {
                        error: e.to_string(),
                    },
                };
                (table.name, entry)
            })
            .collect();

        Self {
            database: database.into(),
            db_type,
            total_tables,
            tables,
        }
    }

    /// Number of tables whose describe call failed.
    pub fn failed_count(&self) -> usize {
        self.tables.iter().filter(|(_, e)| e.is_failed()).count()
    }
}
