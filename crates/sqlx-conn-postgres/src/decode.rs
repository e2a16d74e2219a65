//! Decoding PostgreSQL rows into engine-neutral records

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgRow, PgValue, PgValueRef, Postgres};
use sqlx::{Column, Decode, Row, Type, TypeInfo, Value, ValueRef};
use sqlx_conn_core::{Error, Record, Result};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Decode every column of `row`, preserving column order.
pub(crate) fn to_record(row: &PgRow) -> Result<Record> {
   let mut columns = Vec::with_capacity(row.len());
   let mut values = Vec::with_capacity(row.len());
   for (i, column) in row.columns().iter().enumerate() {
      columns.push(column.name().to_string());
      values.push(to_json(row.try_get_raw(i)?)?);
   }
   Record::new(columns, values)
}

/// Map one Postgres value to JSON by its column type.
///
/// `BYTEA` decodes as a standard base64 string, `UUID` as its hyphenated
/// form, and date/time types as ISO-8601 strings (`TIMESTAMPTZ` in UTC with
/// an offset, `TIMESTAMP` without one). `NUMERIC` and any type not listed
/// here fail with [`Error::UnsupportedDatatype`]; cast in SQL to read them.
pub(crate) fn to_json(value: PgValueRef<'_>) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let owned = ValueRef::to_owned(&value);
   let type_name = owned.type_info().name().to_string();
   let json = match type_name.as_str() {
      "BOOL" => JsonValue::Bool(decode::<bool>(&owned)?),
      "INT2" => JsonValue::from(decode::<i16>(&owned)?),
      "INT4" => JsonValue::from(decode::<i32>(&owned)?),
      "INT8" => JsonValue::from(decode::<i64>(&owned)?),
      "FLOAT4" => JsonValue::from(f64::from(decode::<f32>(&owned)?)),
      "FLOAT8" => JsonValue::from(decode::<f64>(&owned)?),
      "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
         JsonValue::String(decode::<String>(&owned)?)
      }
      "UUID" => JsonValue::String(decode::<Uuid>(&owned)?.to_string()),
      "JSON" | "JSONB" => decode::<JsonValue>(&owned)?,
      "BYTEA" => JsonValue::String(BASE64_STANDARD.encode(decode::<Vec<u8>>(&owned)?)),
      "TIMESTAMPTZ" => JsonValue::String(format_rfc3339(decode::<OffsetDateTime>(&owned)?)?),
      "TIMESTAMP" => {
         let utc = format_rfc3339(decode::<PrimitiveDateTime>(&owned)?.assume_utc())?;
         JsonValue::String(utc.trim_end_matches('Z').to_string())
      }
      "DATE" => JsonValue::String(decode::<Date>(&owned)?.to_string()),
      "TIME" => JsonValue::String(format_time(decode::<Time>(&owned)?)),
      "VOID" => JsonValue::Null,
      _ => return Err(Error::UnsupportedDatatype(type_name)),
   };

   Ok(json)
}

fn decode<T>(value: &PgValue) -> Result<T>
where
   T: for<'r> Decode<'r, Postgres> + Type<Postgres>,
{
   value
      .try_decode::<T>()
      .map_err(|e| Error::Decode(e.to_string()))
}

fn format_rfc3339(datetime: OffsetDateTime) -> Result<String> {
   datetime
      .format(&Rfc3339)
      .map_err(|e| Error::Decode(e.to_string()))
}

/// `HH:MM:SS`, with microseconds only when non-zero.
fn format_time(time: Time) -> String {
   let (hour, minute, second, micro) = time.as_hms_micro();
   if micro == 0 {
      format!("{hour:02}:{minute:02}:{second:02}")
   } else {
      format!("{hour:02}:{minute:02}:{second:02}.{micro:06}")
   }
}
