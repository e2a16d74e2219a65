//! Engine-neutral write outcomes and decoded records

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Error, Result};

/// Result returned from statements that produce no row set (INSERT, UPDATE,
/// DELETE, DDL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
   /// The number of rows affected by the statement.
   pub rows_affected: u64,
   /// The last inserted row ID.
   ///
   /// Only reported by SQLite (ROWID). PostgreSQL leaves this `None`; use
   /// `RETURNING` instead.
   pub last_insert_id: Option<i64>,
}

impl ExecResult {
   pub fn rows_affected(&self) -> u64 {
      self.rows_affected
   }
}

/// A single decoded row.
///
/// Values are held as JSON so that records coming from either engine look
/// the same. Column order is preserved and positional access is
/// authoritative: a query may legitimately return two columns with the same
/// name.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
   columns: Vec<String>,
   values: Vec<JsonValue>,
}

impl Record {
   /// Build a record from parallel column and value lists.
   ///
   /// Fails with [`Error::Decode`] if the lists differ in length.
   pub fn new(columns: Vec<String>, values: Vec<JsonValue>) -> Result<Self> {
      if columns.len() != values.len() {
         return Err(Error::Decode(format!(
            "record has {} columns but {} values",
            columns.len(),
            values.len()
         )));
      }
      Ok(Self { columns, values })
   }

   pub fn columns(&self) -> &[String] {
      &self.columns
   }

   pub fn values(&self) -> &[JsonValue] {
      &self.values
   }

   pub fn len(&self) -> usize {
      self.values.len()
   }

   pub fn is_empty(&self) -> bool {
      self.values.is_empty()
   }

   /// Raw JSON value at `index`.
   pub fn value(&self, index: usize) -> Option<&JsonValue> {
      self.values.get(index)
   }

   /// Raw JSON value of the first column named `name`.
   pub fn value_by_name(&self, name: &str) -> Option<&JsonValue> {
      self
         .columns
         .iter()
         .position(|c| c == name)
         .and_then(|i| self.values.get(i))
   }

   /// Decode the value at `index` into `T`.
   pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
      let value = self
         .values
         .get(index)
         .ok_or_else(|| Error::ColumnNotFound(index.to_string()))?;
      Ok(T::deserialize(value)?)
   }

   /// Decode the value of the first column named `name` into `T`.
   pub fn get_by_name<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
      let value = self
         .value_by_name(name)
         .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
      Ok(T::deserialize(value)?)
   }

   /// Scan all columns positionally into `T`, typically a tuple.
   ///
   /// ```
   /// use serde_json::json;
   /// use sqlx_conn_core::Record;
   ///
   /// let record = Record::new(
   ///    vec!["id".into(), "name".into()],
   ///    vec![json!(7), json!("Alice")],
   /// )
   /// .unwrap();
   /// let (id, name): (i64, String) = record.scan().unwrap();
   /// assert_eq!((id, name.as_str()), (7, "Alice"));
   /// ```
   pub fn scan<T: DeserializeOwned>(&self) -> Result<T> {
      let values = JsonValue::Array(self.values.clone());
      Ok(serde_json::from_value(values)?)
   }

   /// Decode the record by column name into `T`, typically a struct
   /// deriving `Deserialize`.
   pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
      let object = self
         .to_map()
         .into_iter()
         .collect::<serde_json::Map<String, JsonValue>>();
      Ok(serde_json::from_value(JsonValue::Object(object))?)
   }

   /// Column name to value map. When names repeat, the first column wins.
   pub fn to_map(&self) -> IndexMap<String, JsonValue> {
      let mut map = IndexMap::with_capacity(self.values.len());
      for (column, value) in self.columns.iter().zip(&self.values) {
         map.entry(column.clone()).or_insert_with(|| value.clone());
      }
      map
   }
}

/// Outcome of a single-row query.
///
/// Constructing a `Row` never fails. Whatever went wrong while running the
/// query, including finding no matching row, is reported by [`Row::scan`]
/// and its siblings.
#[derive(Debug)]
pub struct Row {
   inner: Result<Option<Record>>,
}

impl Row {
   pub fn new(inner: Result<Option<Record>>) -> Self {
      Self { inner }
   }

   /// The record, [`Error::NoRows`] when the query matched nothing, or the
   /// error raised while running the query.
   pub fn into_record(self) -> Result<Record> {
      self.inner?.ok_or(Error::NoRows)
   }

   /// Scan the row positionally into `T`.
   pub fn scan<T: DeserializeOwned>(self) -> Result<T> {
      self.into_record()?.scan()
   }

   /// Decode the row by column name into `T`.
   pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
      self.into_record()?.decode()
   }

   /// Like [`Row::into_record`] but maps "no rows" to `Ok(None)`.
   pub fn optional(self) -> Result<Option<Record>> {
      self.inner
   }
}
