//! Embedded SQLite database handle (root connection)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use sqlx_conn_core::{Connection, Context, Error, ExecResult, FinalizePolicy, Result, Row, Rows};
use tracing::{debug, error, info};

use crate::bind::bind_all;
use crate::config::SqliteDatabaseConfig;
use crate::decode;
use crate::transaction::SqliteTransaction;

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Root connection to an embedded SQLite database.
///
/// ## Architecture
///
/// - **`pool`**: sqlx pool over the database file. For `:memory:` the pool
///   holds exactly one connection that is never recycled, so the database
///   lives as long as the pool.
/// - **`path`**: database file path, kept for logging
/// - **`policy`**: finalize policy handed to every transaction
///
/// Every pooled connection runs with `PRAGMA foreign_keys = ON`; opening
/// fails if the pragma does not take effect.
///
/// Cloning is cheap and clones share the pool. [`Connection::close`] on any
/// clone closes the pool for all of them.
#[derive(Debug, Clone)]
pub struct SqliteDatabase {
   pool: Pool<Sqlite>,
   path: PathBuf,
   policy: FinalizePolicy,
}

impl SqliteDatabase {
   /// Open (or create) the database at `path`.
   ///
   /// Fails if the file cannot be opened or foreign key enforcement cannot
   /// be enabled. No handle is returned on failure.
   pub async fn connect(
      path: impl AsRef<Path>,
      custom_config: Option<SqliteDatabaseConfig>,
   ) -> Result<Self> {
      let path = path.as_ref().to_path_buf();
      let config = custom_config.unwrap_or_default();
      let in_memory = path.as_os_str() == MEMORY_PATH;

      let options = if in_memory {
         SqliteConnectOptions::from_str("sqlite::memory:")?
      } else {
         SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(config.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
      };
      let options = options
         .foreign_keys(true)
         .busy_timeout(config.busy_timeout);

      let pool_options = if in_memory {
         SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
      } else {
         SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .idle_timeout(Some(config.idle_timeout))
      };

      let pool = match pool_options.connect_with(options).await {
         Ok(pool) => pool,
         Err(err) => {
            error!(path = %path.display(), error = %err, "Failed to open sqlite db");
            return Err(err.into());
         }
      };

      if let Err(err) = enable_foreign_keys(&pool, &path).await {
         error!(path = %path.display(), error = %err, "Failed to enable foreign keys support");
         pool.close().await;
         return Err(err);
      }

      info!(path = %path.display(), "sqlite db opened");

      Ok(Self {
         pool,
         path,
         policy: config.finalize_policy,
      })
   }

   /// Open a private in-memory database.
   pub async fn in_memory() -> Result<Self> {
      Self::connect(MEMORY_PATH, None).await
   }

   pub fn path(&self) -> &Path {
      &self.path
   }

   /// Underlying sqlx pool, for callers that need native sqlx APIs.
   pub fn pool(&self) -> &Pool<Sqlite> {
      &self.pool
   }

   pub fn is_closed(&self) -> bool {
      self.pool.is_closed()
   }
}

/// Turn on foreign key enforcement and confirm it took effect.
async fn enable_foreign_keys(pool: &Pool<Sqlite>, path: &Path) -> Result<()> {
   sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

   let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
      .fetch_one(pool)
      .await?;

   if enabled != 1 {
      return Err(Error::ForeignKeysUnavailable(path.display().to_string()));
   }
   Ok(())
}

impl Connection for SqliteDatabase {
   type Transaction<'c> = SqliteTransaction;

   async fn exec(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Result<ExecResult> {
      ctx.run(async {
         let result = if args.is_empty() {
            sqlx::raw_sql(query).execute(&self.pool).await?
         } else {
            bind_all(sqlx::query(query), args)
               .execute(&self.pool)
               .await?
         };
         Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
         })
      })
      .await
   }

   async fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> Result<Rows<'c>> {
      let stream = bind_all(sqlx::query(query), args)
         .fetch(&self.pool)
         .map(|row| decode::to_record(&row?))
         .boxed();
      Rows::open(ctx, stream).await
   }

   async fn query_row(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Row {
      let result = ctx
         .run(async {
            let row = bind_all(sqlx::query(query), args)
               .fetch_optional(&self.pool)
               .await?;
            row.as_ref().map(decode::to_record).transpose()
         })
         .await;
      Row::new(result)
   }

   async fn begin(&mut self, ctx: &Context) -> Result<SqliteTransaction> {
      let tx = ctx.run(async { Ok(self.pool.begin().await?) }).await?;
      debug!(parent: ctx.span(), "Transaction started for db: {}", self.path.display());
      Ok(SqliteTransaction::new(tx, ctx.clone(), self.policy))
   }

   async fn close(self) {
      self.pool.close().await;
      debug!("sqlite db closed: {}", self.path.display());
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;
   use tempfile::TempDir;

   async fn create_test_db() -> (SqliteDatabase, TempDir) {
      let temp_dir = TempDir::new().expect("Failed to create temp directory");
      let db_path = temp_dir.path().join("test.db");
      let db = SqliteDatabase::connect(&db_path, None)
         .await
         .expect("Failed to connect to test database");

      (db, temp_dir)
   }

   #[tokio::test]
   async fn test_exec_and_write_result() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();

      // DDL returns 0 rows affected
      let result = db
         .exec(&ctx, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", vec![])
         .await
         .unwrap();

      assert_eq!(result.rows_affected(), 0);

      // INSERT returns rows_affected and last_insert_id
      let result = db
         .exec(&ctx, "INSERT INTO t (name) VALUES ($1)", vec![json!("Alice")])
         .await
         .unwrap();

      assert_eq!((result.rows_affected, result.last_insert_id), (1, Some(1)));

      let result = db
         .exec(&ctx, "INSERT INTO t (name) VALUES (?)", vec![json!("Bob")])
         .await
         .unwrap();

      assert_eq!((result.rows_affected, result.last_insert_id), (1, Some(2)));

      // UPDATE affects multiple rows
      let result = db
         .exec(&ctx, "UPDATE t SET name = 'X' WHERE id > 0", vec![])
         .await
         .unwrap();

      assert_eq!(result.rows_affected(), 2);

      db.close().await;
   }

   #[tokio::test]
   async fn test_exec_runs_multi_statement_batch_without_args() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();

      db.exec(
         &ctx,
         "CREATE TABLE a (id INTEGER PRIMARY KEY); CREATE TABLE b (id INTEGER PRIMARY KEY); INSERT INTO a VALUES (1);",
         vec![],
      )
      .await
      .unwrap();

      let (count,): (i64,) = db
         .query_row(&ctx, "SELECT count(*) FROM a", vec![])
         .await
         .scan()
         .unwrap();
      assert_eq!(count, 1);

      db.close().await;
   }

   #[tokio::test]
   async fn test_query_rows_cursor() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(
         &ctx,
         "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, active INT)",
         vec![],
      )
      .await
      .unwrap();

      // Empty table yields an empty cursor
      let mut rows = db.query(&ctx, "SELECT * FROM t", vec![]).await.unwrap();
      assert!(!rows.next().await);
      rows.close().unwrap();

      db.exec(
         &ctx,
         "INSERT INTO t (name, active) VALUES ($1,$2), ($3,$4), ($5,$6)",
         vec![
            json!("Alice"),
            json!(1),
            json!("Bob"),
            json!(0),
            json!("Charlie"),
            json!(1),
         ],
      )
      .await
      .unwrap();

      let mut rows = db
         .query(&ctx, "SELECT name FROM t WHERE active = $1 ORDER BY id", vec![json!(1)])
         .await
         .unwrap();

      let mut names = Vec::new();
      while rows.next().await {
         let (name,): (String,) = rows.scan().unwrap();
         names.push(name);
      }
      assert!(rows.err().is_none());
      rows.close().unwrap();

      assert_eq!(names, vec!["Alice", "Charlie"]);

      db.close().await;
   }

   #[tokio::test]
   async fn test_query_rejects_malformed_sql_immediately() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();

      let err = db
         .query(&ctx, "SELEC nonsense FROM", vec![])
         .await
         .unwrap_err();
      assert!(matches!(err, Error::Sqlx(_)));

      db.close().await;
   }

   #[tokio::test]
   async fn test_query_row_no_rows() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(&ctx, "CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
         .await
         .unwrap();

      let row = db
         .query_row(&ctx, "SELECT id FROM t WHERE id = $1", vec![json!(999)])
         .await;
      assert!(row.scan::<(i64,)>().unwrap_err().is_no_rows());

      db.close().await;
   }

   #[tokio::test]
   async fn test_type_binding_and_decoding() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(
         &ctx,
         "CREATE TABLE t (id INTEGER PRIMARY KEY, txt TEXT, num REAL, big INTEGER, flag BOOLEAN, data BLOB)",
         vec![],
      )
      .await
      .unwrap();

      let large_int: i64 = 9_007_199_254_740_992; // 2^53

      db.exec(&ctx, "INSERT INTO t (txt) VALUES ($1)", vec![JsonValue::Null])
         .await
         .unwrap();
      db.exec(
         &ctx,
         "INSERT INTO t (txt, num) VALUES ($1, $2)",
         vec![json!("hello"), json!(1.23456)],
      )
      .await
      .unwrap();
      db.exec(&ctx, "INSERT INTO t (big) VALUES ($1)", vec![json!(large_int)])
         .await
         .unwrap();
      db.exec(&ctx, "INSERT INTO t (flag) VALUES (TRUE)", vec![])
         .await
         .unwrap();
      // BLOB ("Hello" in hex)
      db.exec(&ctx, "INSERT INTO t (data) VALUES (X'48656C6C6F')", vec![])
         .await
         .unwrap();

      let records = db
         .query(&ctx, "SELECT * FROM t ORDER BY id", vec![])
         .await
         .unwrap()
         .collect()
         .await
         .unwrap();

      // NULL decoding
      assert_eq!(records[0].value_by_name("txt"), Some(&JsonValue::Null));

      // Float decoding (with tolerance)
      let num: f64 = records[1].get_by_name("num").unwrap();
      assert!((num - 1.23456).abs() < 0.0001);

      // Large integer precision
      assert_eq!(records[2].value_by_name("big"), Some(&json!(large_int)));

      // Boolean stored as integer
      assert_eq!(records[3].value_by_name("flag"), Some(&json!(1)));

      // BLOB as base64
      assert_eq!(
         records[4].get_by_name::<String>("data").unwrap(),
         "SGVsbG8="
      );

      db.close().await;
   }

   #[tokio::test]
   async fn test_column_order_preserved() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(&ctx, "CREATE TABLE t (z TEXT, a TEXT, m TEXT)", vec![])
         .await
         .unwrap();
      db.exec(
         &ctx,
         "INSERT INTO t VALUES ($1, $2, $3)",
         vec![json!("z"), json!("a"), json!("m")],
      )
      .await
      .unwrap();

      let record = db
         .query_row(&ctx, "SELECT z, a, m FROM t", vec![])
         .await
         .into_record()
         .unwrap();

      assert_eq!(record.columns(), ["z", "a", "m"]);

      db.close().await;
   }

   #[tokio::test]
   async fn test_foreign_keys_enforced() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(
         &ctx,
         "CREATE TABLE users (id INTEGER PRIMARY KEY); CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL REFERENCES users(id));",
         vec![],
      )
      .await
      .unwrap();

      let err = db
         .exec(&ctx, "INSERT INTO posts (user_id) VALUES ($1)", vec![json!(42)])
         .await
         .unwrap_err();
      assert!(matches!(err, Error::Sqlx(_)));
      assert!(err.error_code().starts_with("DATABASE_"));

      db.close().await;
   }

   #[tokio::test]
   async fn test_in_memory_database_persists_across_calls() {
      let mut db = SqliteDatabase::in_memory().await.unwrap();
      let ctx = Context::background();

      db.exec(&ctx, "CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![])
         .await
         .unwrap();
      db.exec(&ctx, "INSERT INTO t VALUES (1)", vec![])
         .await
         .unwrap();

      let (id,): (i64,) = db
         .query_row(&ctx, "SELECT id FROM t", vec![])
         .await
         .scan()
         .unwrap();
      assert_eq!(id, 1);

      db.close().await;
   }

   #[tokio::test]
   async fn test_open_fails_for_missing_file_without_create() {
      let temp_dir = TempDir::new().unwrap();
      let config = SqliteDatabaseConfig {
         create_if_missing: false,
         ..Default::default()
      };

      let result = SqliteDatabase::connect(temp_dir.path().join("missing.db"), Some(config)).await;
      assert!(result.is_err());
   }

   #[tokio::test]
   async fn test_cancelled_context_aborts_exec() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      ctx.cancel();

      let err = db
         .exec(&ctx, "CREATE TABLE t (id INTEGER)", vec![])
         .await
         .unwrap_err();
      assert!(matches!(err, Error::Cancelled));

      let row = db.query_row(&ctx, "SELECT 1", vec![]).await;
      assert!(matches!(row.scan::<(i64,)>(), Err(Error::Cancelled)));

      db.close().await;
   }

   #[tokio::test]
   async fn test_close() {
      let (mut db, _temp) = create_test_db().await;
      let ctx = Context::background();
      db.exec(&ctx, "CREATE TABLE t (id INTEGER)", vec![])
         .await
         .unwrap();

      let other = db.clone();
      db.close().await;
      assert!(other.is_closed());
   }
}
