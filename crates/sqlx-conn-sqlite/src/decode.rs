//! Decoding SQLite rows into engine-neutral records

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{Sqlite, SqliteRow, SqliteValue, SqliteValueRef};
use sqlx::{Column, Decode, Row, TypeInfo, Value, ValueRef};
use sqlx_conn_core::{Error, Record, Result};

/// Decode every column of `row`, preserving column order.
pub(crate) fn to_record(row: &SqliteRow) -> Result<Record> {
   let mut columns = Vec::with_capacity(row.len());
   let mut values = Vec::with_capacity(row.len());
   for (i, column) in row.columns().iter().enumerate() {
      columns.push(column.name().to_string());
      values.push(to_json(row.try_get_raw(i)?)?);
   }
   Record::new(columns, values)
}

/// Map one SQLite value to JSON by its storage class.
///
/// SQLite is dynamically typed, so the value's own type wins over the
/// declared column type: a `BOOLEAN` column holding `1` decodes as `1`.
/// Blobs decode as standard base64 strings.
pub(crate) fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let owned = ValueRef::to_owned(&value);
   let type_name = owned.type_info().name().to_string();
   let json = match type_name.as_str() {
      "TEXT" | "DATE" | "TIME" | "DATETIME" => JsonValue::String(decode::<String>(&owned)?),
      "INTEGER" => JsonValue::from(decode::<i64>(&owned)?),
      "REAL" => JsonValue::from(decode::<f64>(&owned)?),
      "NUMERIC" => match decode::<i64>(&owned) {
         Ok(int_val) => JsonValue::from(int_val),
         Err(_) => JsonValue::from(decode::<f64>(&owned)?),
      },
      "BOOLEAN" => JsonValue::Bool(decode::<bool>(&owned)?),
      "BLOB" => JsonValue::String(BASE64_STANDARD.encode(decode::<Vec<u8>>(&owned)?)),
      "NULL" => JsonValue::Null,
      _ => return Err(Error::UnsupportedDatatype(type_name)),
   };

   Ok(json)
}

fn decode<T>(value: &SqliteValue) -> Result<T>
where
   T: for<'r> Decode<'r, Sqlite>,
{
   value
      .try_decode_unchecked::<T>()
      .map_err(|e| Error::Decode(e.to_string()))
}
