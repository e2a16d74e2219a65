//! # sqlx-conn-postgres
//!
//! Pooled PostgreSQL adapter for the `sqlx-conn` [`Connection`] contract.
//!
//! ## Core Types
//!
//! - **[`PostgresDatabase`]**: root connection over a server connection pool
//! - **[`PostgresTransaction`]**: transactional connection, finalized on close
//! - **[`PostgresDatabaseConfig`]**: pool settings
//! - **[`Migrator`]** / **[`run_postgres_migrations`]**: versioned directory
//!   migrations tracked in a `schema_version` table
//!
//! Arguments bind as `BOOL`, `INT8`, `FLOAT8`, `TEXT` or `JSONB` depending on
//! the JSON value; cast in SQL for anything else (`$1::uuid`).
//!
//! ## Example
//!
//! ```no_run
//! use sqlx_conn_core::{Connection, Context, json};
//! use sqlx_conn_postgres::{PostgresDatabase, run_postgres_migrations};
//!
//! # async fn example() -> sqlx_conn_core::Result<()> {
//! let ctx = Context::background();
//! let mut db = PostgresDatabase::connect("postgres://localhost/app", None).await?;
//! run_postgres_migrations(&ctx, &db).await?;
//!
//! let mut tx = db.begin(&ctx).await?;
//! let result = tx.exec(&ctx, "INSERT INTO users (name) VALUES ($1)", vec![json!("Ada")]).await;
//! tx.record(result)?;
//! tx.close().await;
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

pub use config::PostgresDatabaseConfig;
pub use database::PostgresDatabase;
pub use migrate::{
   MIGRATIONS_DIR, MigrationReport, MigrationScript, Migrator, SCHEMA_VERSION_TABLE,
   run_postgres_migrations,
};
pub use transaction::PostgresTransaction;

pub use sqlx_conn_core::{Connection, Context, Error, Result};
