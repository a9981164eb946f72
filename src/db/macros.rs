//! Database dispatch macros for reducing code duplication.
//!
//! Handlers and inspectors pattern-match on [`DbConnection`] in many places;
//! this macro keeps those matches to one line per engine.
//!
//! [`DbConnection`]: crate::db::connection::DbConnection

/// Macro for generating connection dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => do_mysql(c),
///     Postgres(c) => do_postgres(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
