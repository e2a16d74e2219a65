//! Engine chosen at runtime from a connection URL

use sqlx_conn_core::{
   Connection, Context, Error, ExecResult, JsonValue, Result, Row, Rows, TxState,
};
use tracing::debug;

#[cfg(feature = "postgres")]
use sqlx_conn_postgres::{PostgresDatabase, PostgresTransaction};
#[cfg(feature = "sqlite")]
use sqlx_conn_sqlite::{MEMORY_PATH, SqliteDatabase, SqliteTransaction};

/// Root connection to whichever engine a URL names.
///
/// | URL                                   | Engine                 |
/// |---------------------------------------|------------------------|
/// | `postgres://…`, `postgresql://…`      | PostgreSQL             |
/// | `sqlite://path`, `sqlite:path`        | SQLite file            |
/// | `sqlite::memory:`, `:memory:`         | SQLite in-memory       |
/// | a plain file path                     | SQLite file            |
///
/// Any other `scheme://` fails with [`Error::UnsupportedUrl`], as does a
/// scheme whose adapter feature is disabled.
#[derive(Debug, Clone)]
pub enum AnyDatabase {
   #[cfg(feature = "sqlite")]
   Sqlite(SqliteDatabase),
   #[cfg(feature = "postgres")]
   Postgres(PostgresDatabase),
}

/// Transaction of an [`AnyDatabase`].
#[must_use = "if unused, the transaction is immediately rolled back"]
#[derive(Debug)]
pub enum AnyTransaction {
   #[cfg(feature = "sqlite")]
   Sqlite(SqliteTransaction),
   #[cfg(feature = "postgres")]
   Postgres(PostgresTransaction),
}

/// Where a URL points, before any connection is made.
#[derive(Debug, PartialEq, Eq)]
enum Target<'a> {
   Sqlite(&'a str),
   Postgres(&'a str),
}

fn parse_target(url: &str) -> Result<Target<'_>> {
   if url.starts_with("postgres://") || url.starts_with("postgresql://") {
      return Ok(Target::Postgres(url));
   }
   if url == "sqlite::memory:" {
      return Ok(Target::Sqlite(":memory:"));
   }
   if let Some(path) = url.strip_prefix("sqlite://") {
      return Ok(Target::Sqlite(path));
   }
   if let Some(path) = url.strip_prefix("sqlite:") {
      return Ok(Target::Sqlite(path));
   }
   if url.is_empty() || url.contains("://") {
      return Err(Error::UnsupportedUrl(url.to_string()));
   }
   Ok(Target::Sqlite(url))
}

impl AnyDatabase {
   /// Connect with the adapter's default configuration.
   pub async fn connect(url: &str) -> Result<Self> {
      match parse_target(url)? {
         #[cfg(feature = "sqlite")]
         Target::Sqlite(path) => {
            debug!("Opening sqlite database: {}", path);
            Ok(Self::Sqlite(SqliteDatabase::connect(path, None).await?))
         }
         #[cfg(feature = "postgres")]
         Target::Postgres(url) => {
            debug!("Opening postgres pool");
            Ok(Self::Postgres(PostgresDatabase::connect(url, None).await?))
         }
         #[allow(unreachable_patterns)]
         _ => Err(Error::UnsupportedUrl(url.to_string())),
      }
   }

   /// Private in-memory SQLite database.
   #[cfg(feature = "sqlite")]
   pub async fn in_memory() -> Result<Self> {
      Self::connect(MEMORY_PATH).await
   }

   /// `"sqlite"` or `"postgres"`.
   pub fn engine(&self) -> &'static str {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(_) => "sqlite",
         #[cfg(feature = "postgres")]
         Self::Postgres(_) => "postgres",
      }
   }

   pub fn is_closed(&self) -> bool {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => db.is_closed(),
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => db.is_closed(),
      }
   }
}

impl Connection for AnyDatabase {
   type Transaction<'c> = AnyTransaction;

   async fn exec(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Result<ExecResult> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => db.exec(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => db.exec(ctx, query, args).await,
      }
   }

   async fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> Result<Rows<'c>> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => db.query(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => db.query(ctx, query, args).await,
      }
   }

   async fn query_row(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Row {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => db.query_row(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => db.query_row(ctx, query, args).await,
      }
   }

   async fn begin(&mut self, ctx: &Context) -> Result<AnyTransaction> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => Ok(AnyTransaction::Sqlite(db.begin(ctx).await?)),
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => Ok(AnyTransaction::Postgres(db.begin(ctx).await?)),
      }
   }

   async fn close(self) {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(db) => db.close().await,
         #[cfg(feature = "postgres")]
         Self::Postgres(db) => db.close().await,
      }
   }
}

impl AnyTransaction {
   /// Mark the transaction for rollback on close.
   pub fn fail(&mut self, reason: impl std::fmt::Display) {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.fail(reason),
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.fail(reason),
      }
   }

   pub fn record<T>(&mut self, result: Result<T>) -> Result<T> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.record(result),
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.record(result),
      }
   }

   pub fn failure(&self) -> Option<&str> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.failure(),
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.failure(),
      }
   }

   pub fn state(&self) -> TxState {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.state(),
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.state(),
      }
   }

   pub async fn finish(self) -> TxState {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.finish().await,
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.finish().await,
      }
   }
}

impl Connection for AnyTransaction {
   type Transaction<'c> = &'c mut AnyTransaction;

   async fn exec(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Result<ExecResult> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.exec(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.exec(ctx, query, args).await,
      }
   }

   async fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> Result<Rows<'c>> {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.query(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.query(ctx, query, args).await,
      }
   }

   async fn query_row(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Row {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.query_row(ctx, query, args).await,
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.query_row(ctx, query, args).await,
      }
   }

   async fn begin(&mut self, _ctx: &Context) -> Result<&mut AnyTransaction> {
      Ok(self)
   }

   async fn close(self) {
      match self {
         #[cfg(feature = "sqlite")]
         Self::Sqlite(tx) => tx.close().await,
         #[cfg(feature = "postgres")]
         Self::Postgres(tx) => tx.close().await,
      }
   }
}
