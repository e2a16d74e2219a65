//! # sqlx-conn-sqlite
//!
//! Embedded SQLite adapter for the `sqlx-conn` [`Connection`] contract.
//!
//! ## Core Types
//!
//! - **[`SqliteDatabase`]**: root connection owning the database file's pool
//! - **[`SqliteTransaction`]**: transactional connection, finalized on close
//! - **[`SqliteDatabaseConfig`]**: pool and pragma settings
//! - **[`run_sqlite_migrations`]**: apply a single SQL script file
//!
//! ## Example
//!
//! ```no_run
//! use sqlx_conn_core::{Connection, Context, json};
//! use sqlx_conn_sqlite::SqliteDatabase;
//!
//! # async fn example() -> sqlx_conn_core::Result<()> {
//! let ctx = Context::background();
//! let mut db = SqliteDatabase::connect("app.db", None).await?;
//! db.exec(&ctx, "CREATE TABLE t (id INTEGER PRIMARY KEY)", vec![]).await?;
//!
//! let mut tx = db.begin(&ctx).await?;
//! if let Err(err) = tx.exec(&ctx, "INSERT INTO t VALUES ($1)", vec![json!(1)]).await {
//!    tx.fail(err);
//! }
//! tx.close().await; // commits, or rolls back if marked failed
//!
//! db.close().await;
//! # Ok(())
//! # }
//! ```

mod bind;
mod config;
mod database;
mod decode;
mod migrate;
mod transaction;

pub use config::SqliteDatabaseConfig;
pub use database::{MEMORY_PATH, SqliteDatabase};
pub use migrate::run_sqlite_migrations;
pub use transaction::SqliteTransaction;

pub use sqlx_conn_core::{Connection, Context, Error, Result};
