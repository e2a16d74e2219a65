//! Binding JSON arguments to SQLite statements

use serde_json::Value as JsonValue;
use sqlx::Sqlite;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind every argument, in order, to `query`.
pub(crate) fn bind_all<'q>(mut query: SqliteQuery<'q>, args: Vec<JsonValue>) -> SqliteQuery<'q> {
   for value in args {
      query = bind_value(query, value);
   }
   query
}

/// Helper function to bind a JSON value to a SQLx query
fn bind_value<'q>(query: SqliteQuery<'q>, value: JsonValue) -> SqliteQuery<'q> {
   match value {
      JsonValue::Null => query.bind(None::<JsonValue>),
      JsonValue::Bool(b) => query.bind(b),
      JsonValue::String(s) => query.bind(s),
      JsonValue::Number(number) => {
         // Preserve integer precision by binding as i64 when possible
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else if let Some(uint_val) = number.as_u64() {
            // Value too large for i64 (SQLite's INTEGER type), use f64 (will lose precision)
            query.bind(uint_val as f64)
         } else {
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      // Arrays and objects are stored as JSON text
      other => query.bind(other),
   }
}
