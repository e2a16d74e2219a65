//! Binding JSON arguments to PostgreSQL statements

use serde_json::Value as JsonValue;
use sqlx::encode::{Encode, IsNull};
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgTypeInfo};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{Postgres, Type};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// A NULL sent with no declared type, so the server infers it from where
/// the parameter is used.
struct UntypedNull;

impl Type<Postgres> for UntypedNull {
   fn type_info() -> PgTypeInfo {
      // OID 0 leaves the parameter type unspecified
      PgTypeInfo::with_oid(Oid(0))
   }
}

impl Encode<'_, Postgres> for UntypedNull {
   fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
      Ok(IsNull::Yes)
   }
}

/// Bind every argument, in order, to `query`.
pub(crate) fn bind_all<'q>(query: PgQuery<'q>, args: Vec<JsonValue>) -> PgQuery<'q> {
   // The server fixes an untyped null's type when the statement is prepared;
   // keep such statements out of the cache so later calls with real values
   // prepare their own
   let mut query = query.persistent(!args.iter().any(JsonValue::is_null));
   for value in args {
      query = bind_value(query, value);
   }
   query
}

/// Bind one JSON value using the closest native Postgres type.
///
/// Strings bind as `TEXT`, so columns of other types need an explicit cast
/// in the statement (`$1::uuid`, `$2::timestamptz`). Null binds untyped and
/// fits any column.
fn bind_value<'q>(query: PgQuery<'q>, value: JsonValue) -> PgQuery<'q> {
   match value {
      JsonValue::Null => query.bind(UntypedNull),
      JsonValue::Bool(b) => query.bind(b),
      JsonValue::String(s) => query.bind(s),
      JsonValue::Number(number) => {
         if let Some(int_val) = number.as_i64() {
            query.bind(int_val)
         } else {
            // u64 beyond i64::MAX has no native Postgres integer type
            query.bind(number.as_f64().unwrap_or_default())
         }
      }
      other => query.bind(Json(other)),
   }
}
