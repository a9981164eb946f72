//! Method handlers.
//!
//! This module contains the gateway's method handlers:
//! - `schema`: `db.list_tables`, `db.describe_table` and `db.get_schema`
//! - `query`: `db.query` for SELECT statements
//! - `record`: `db.get_record` for single-row lookups by key
//! - `validator`: SELECT-only statement validation
//! - `input`: typed method parameters

pub mod input;
pub mod query;
pub mod record;
pub mod schema;
pub mod validator;

pub use input::{DescribeTableInput, GetRecordInput, QueryInput, parse_input};
pub use query::{QueryOutput, QueryToolHandler};
pub use record::{GetRecordOutput, RecordToolHandler};
pub use schema::{DescribeTableOutput, GetSchemaOutput, ListTablesOutput, SchemaToolHandler};
pub use validator::validate_select;
