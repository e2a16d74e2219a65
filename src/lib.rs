//! # sqlx-conn
//!
//! One async [`Connection`] contract over an embedded SQLite file and a
//! pooled PostgreSQL server, with transactions that commit or roll back
//! exactly once and migration runners for both engines.
//!
//! ## Crates
//!
//! - **`sqlx-conn-core`**: [`Connection`], [`Rows`], [`Row`], [`Context`],
//!   [`Error`] and the shared transaction finalization state
//! - **`sqlx-conn-sqlite`** (feature `sqlite`): [`SqliteDatabase`] and
//!   [`run_sqlite_migrations`]
//! - **`sqlx-conn-postgres`** (feature `postgres`): [`PostgresDatabase`],
//!   [`Migrator`] and [`run_postgres_migrations`]
//!
//! ## Transactions
//!
//! `begin` on a root connection starts a transaction; `begin` on a
//! transaction returns that same transaction, so helpers written against
//! `C: Connection` join whatever transaction they are handed. `close`
//! commits unless a failure was recorded with `fail`/`record`, in which case
//! it rolls back. Commit and rollback errors are logged, not returned.
//!
//! ```no_run
//! use sqlx_conn::{AnyDatabase, Connection, Context, Result, json};
//!
//! async fn add_user<C: Connection>(conn: &mut C, ctx: &Context, name: &str) -> Result<()> {
//!    let mut tx = conn.begin(ctx).await?;
//!    tx.exec(ctx, "INSERT INTO users (name) VALUES ($1)", vec![json!(name)]).await?;
//!    tx.close().await;
//!    Ok(())
//! }
//!
//! # async fn example() -> Result<()> {
//! let ctx = Context::background();
//! let mut db = AnyDatabase::connect("sqlite::memory:").await?;
//! db.exec(&ctx, "CREATE TABLE users (name TEXT NOT NULL)", vec![]).await?;
//! add_user(&mut db, &ctx, "Ada").await?;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

#[cfg(any(feature = "sqlite", feature = "postgres"))]
mod any;

#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use any::{AnyDatabase, AnyTransaction};

pub use sqlx_conn_core::{
   Connection, Context, Error, ExecResult, FinalizeFlag, FinalizePolicy, JsonValue, Record,
   Result, Row, Rows, TxScope, TxState, json,
};

#[cfg(feature = "sqlite")]
pub use sqlx_conn_sqlite::{
   MEMORY_PATH, SqliteDatabase, SqliteDatabaseConfig, SqliteTransaction, run_sqlite_migrations,
};

#[cfg(feature = "postgres")]
pub use sqlx_conn_postgres::{
   MIGRATIONS_DIR, MigrationReport, MigrationScript, Migrator, PostgresDatabase,
   PostgresDatabaseConfig, PostgresTransaction, SCHEMA_VERSION_TABLE, run_postgres_migrations,
};
