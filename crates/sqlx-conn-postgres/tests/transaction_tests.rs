//! Live-server tests for the pooled adapter. They return early unless
//! `TEST_DATABASE_URL` or `DATABASE_URL` points at a reachable server.

mod common;

use common::{maybe_db, unique_name};
use serde_json::json;
use sqlx_conn_core::{Connection, Context, Error, FinalizePolicy, TxState};
use sqlx_conn_postgres::{PostgresDatabase, PostgresDatabaseConfig, PostgresTransaction};

macro_rules! require_db {
   ($config:expr) => {
      match maybe_db($config).await {
         Some(db) => db,
         None => {
            eprintln!("Skipping: TEST_DATABASE_URL/DATABASE_URL is not set or database is unreachable.");
            return;
         }
      }
   };
}

async fn create_table(db: &mut PostgresDatabase, ctx: &Context) -> String {
   let table = unique_name("t");
   db.exec(ctx, &format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY)"), vec![])
      .await
      .unwrap();
   table
}

async fn drop_table(db: &mut PostgresDatabase, ctx: &Context, table: &str) {
   db.exec(ctx, &format!("DROP TABLE IF EXISTS {table}"), vec![])
      .await
      .unwrap();
}

async fn ids<C: Connection>(conn: &mut C, ctx: &Context, table: &str) -> Vec<i64> {
   let query = format!("SELECT id FROM {table} ORDER BY id");
   let mut rows = conn.query(ctx, &query, vec![]).await.unwrap();

   let mut ids = Vec::new();
   while rows.next().await {
      let (id,): (i64,) = rows.scan().unwrap();
      ids.push(id);
   }
   rows.close().unwrap();
   ids
}

#[tokio::test]
async fn test_commit_and_rollback() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = create_table(&mut db, &ctx).await;
   let insert = format!("INSERT INTO {table} VALUES ($1)");

   let mut tx = db.begin(&ctx).await.unwrap();
   tx.exec(&ctx, &insert, vec![json!(1)]).await.unwrap();
   assert_eq!(tx.finish().await, TxState::Committed);
   assert_eq!(ids(&mut db, &ctx, &table).await, vec![1]);

   let mut tx = db.begin(&ctx).await.unwrap();
   tx.exec(&ctx, &insert, vec![json!(2)]).await.unwrap();
   tx.fail("marked failed");
   tx.close().await;
   assert_eq!(ids(&mut db, &ctx, &table).await, vec![1]);

   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}

#[tokio::test]
async fn test_failed_statement_then_close_keeps_nothing() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = create_table(&mut db, &ctx).await;
   let insert = format!("INSERT INTO {table} VALUES ($1)");

   let mut tx = db.begin(&ctx).await.unwrap();
   tx.exec(&ctx, &insert, vec![json!(1)]).await.unwrap();

   // The server aborts the transaction on a failed statement, so the commit
   // attempted by close turns into a rollback either way
   let result = tx.exec(&ctx, &insert, vec![json!(1)]).await;
   let err = tx.record(result).unwrap_err();
   assert!(err.error_code().starts_with("DATABASE_"));
   tx.close().await;

   assert!(ids(&mut db, &ctx, &table).await.is_empty());
   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}

#[tokio::test]
async fn test_record_statement_errors_policy() {
   let config = PostgresDatabaseConfig {
      finalize_policy: FinalizePolicy::RecordStatementErrors,
      ..Default::default()
   };
   let mut db = require_db!(Some(config));
   let ctx = Context::background();

   let mut tx = db.begin(&ctx).await.unwrap();
   assert!(tx.query(&ctx, "SELECT * FROM no_such_table", vec![]).await.is_err());
   assert!(tx.failure().is_some());
   assert_eq!(tx.finish().await, TxState::RolledBack);

   db.close().await;
}

#[tokio::test]
async fn test_begin_on_transaction_returns_same_transaction() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = create_table(&mut db, &ctx).await;
   let insert = format!("INSERT INTO {table} VALUES ($1)");

   let mut tx = db.begin(&ctx).await.unwrap();
   let outer: *const PostgresTransaction = &tx;
   {
      let nested = tx.begin(&ctx).await.unwrap();
      assert!(std::ptr::eq(nested, outer));
      nested.exec(&ctx, &insert, vec![json!(5)]).await.unwrap();
      nested.close().await;
   }
   assert_eq!(tx.state(), TxState::Open);
   tx.close().await;

   assert_eq!(ids(&mut db, &ctx, &table).await, vec![5]);
   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}

#[tokio::test]
async fn test_query_row_no_rows() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = create_table(&mut db, &ctx).await;

   let row = db
      .query_row(&ctx, &format!("SELECT id FROM {table} WHERE id = $1"), vec![json!(1)])
      .await;
   let err = row.scan::<(i64,)>().unwrap_err();
   assert!(err.is_no_rows());
   assert_eq!(err.error_code(), "NO_ROWS");

   let mut tx = db.begin(&ctx).await.unwrap();
   let row = tx
      .query_row(&ctx, &format!("SELECT id FROM {table}"), vec![])
      .await;
   assert!(matches!(row.into_record(), Err(Error::NoRows)));
   tx.close().await;

   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}

#[tokio::test]
async fn test_type_decoding() {
   let mut db = require_db!(None);
   let ctx = Context::background();

   let record = db
      .query_row(
         &ctx,
         r#"SELECT 1::int2 AS a, 2::int4 AS b, 3::int8 AS c, 1.5::float8 AS d,
                   'x'::text AS e, true AS f,
                   '00000000-0000-0000-0000-000000000001'::uuid AS g,
                   '{"k": 1}'::jsonb AS h, '\x0102'::bytea AS i,
                   '2024-01-02T03:04:05Z'::timestamptz AS j,
                   '2024-01-02 03:04:05'::timestamp AS k,
                   '2024-01-02'::date AS l, NULL::text AS m"#,
         vec![],
      )
      .await
      .into_record()
      .unwrap();

   assert_eq!(
      record.values(),
      &[
         json!(1),
         json!(2),
         json!(3),
         json!(1.5),
         json!("x"),
         json!(true),
         json!("00000000-0000-0000-0000-000000000001"),
         json!({"k": 1}),
         json!("AQI="),
         json!("2024-01-02T03:04:05Z"),
         json!("2024-01-02T03:04:05"),
         json!("2024-01-02"),
         json!(null),
      ]
   );

   let err = db
      .query(&ctx, "SELECT 1.5::numeric AS n", vec![])
      .await
      .unwrap_err();
   assert!(matches!(err, Error::UnsupportedDatatype(name) if name == "NUMERIC"));

   db.close().await;
}

#[tokio::test]
async fn test_argument_binding() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = unique_name("args");
   db.exec(
      &ctx,
      &format!("CREATE TABLE {table} (id INTEGER PRIMARY KEY, score INTEGER, meta JSONB, name TEXT)"),
      vec![],
   )
   .await
   .unwrap();

   let result = db
      .exec(
         &ctx,
         &format!("INSERT INTO {table} VALUES ($1, $2, $3, $4)"),
         vec![json!(1), json!(null), json!({"tags": ["a"]}), json!("Ada")],
      )
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 1);
   assert_eq!(result.last_insert_id, None);

   #[derive(serde::Deserialize)]
   struct Entry {
      id: i64,
      score: Option<i64>,
      meta: serde_json::Value,
      name: String,
   }

   let entry: Entry = db
      .query_row(&ctx, &format!("SELECT * FROM {table}"), vec![])
      .await
      .decode()
      .unwrap();
   assert_eq!(entry.id, 1);
   assert_eq!(entry.score, None);
   assert_eq!(entry.meta, json!({"tags": ["a"]}));
   assert_eq!(entry.name, "Ada");

   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}

#[tokio::test]
async fn test_null_binds_to_any_column_type() {
   let mut db = require_db!(None);
   let ctx = Context::background();
   let table = unique_name("nulls");
   db.exec(
      &ctx,
      &format!(
         "CREATE TABLE {table} (id INTEGER PRIMARY KEY, flag BOOLEAN, doc JSONB, ref UUID, day DATE, score INTEGER)"
      ),
      vec![],
   )
   .await
   .unwrap();

   let insert = format!("INSERT INTO {table} VALUES ($1, $2, $3, $4::uuid, $5::date, $6)");
   db.exec(
      &ctx,
      &insert,
      vec![json!(1), json!(null), json!(null), json!(null), json!(null), json!(null)],
   )
   .await
   .unwrap();

   let record = db
      .query_row(&ctx, &format!("SELECT flag, doc, ref, day, score FROM {table} WHERE id = 1"), vec![])
      .await
      .into_record()
      .unwrap();
   assert!(record.values().iter().all(|v| v.is_null()));

   // Same statement text, now with values of the columns' own kinds
   db.exec(
      &ctx,
      &insert,
      vec![
         json!(2),
         json!(true),
         json!({"a": 1}),
         json!("00000000-0000-0000-0000-000000000002"),
         json!("2024-05-06"),
         json!(9),
      ],
   )
   .await
   .unwrap();

   let record = db
      .query_row(&ctx, &format!("SELECT flag, doc, ref, day, score FROM {table} WHERE id = 2"), vec![])
      .await
      .into_record()
      .unwrap();
   assert_eq!(
      record.values(),
      &[
         json!(true),
         json!({"a": 1}),
         json!("00000000-0000-0000-0000-000000000002"),
         json!("2024-05-06"),
         json!(9),
      ]
   );

   // Null in an UPDATE inside a transaction
   let mut tx = db.begin(&ctx).await.unwrap();
   let result = tx
      .exec(
         &ctx,
         &format!("UPDATE {table} SET flag = $1, doc = $2 WHERE id = $3"),
         vec![json!(null), json!(null), json!(2)],
      )
      .await
      .unwrap();
   assert_eq!(result.rows_affected, 1);
   tx.close().await;

   let (flag, doc): (Option<bool>, serde_json::Value) = db
      .query_row(&ctx, &format!("SELECT flag, doc FROM {table} WHERE id = 2"), vec![])
      .await
      .scan()
      .unwrap();
   assert_eq!(flag, None);
   assert!(doc.is_null());

   drop_table(&mut db, &ctx, &table).await;
   db.close().await;
}
