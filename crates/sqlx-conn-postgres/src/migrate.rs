//! Versioned schema migrations for PostgreSQL
//!
//! Scripts live in one directory, named `<VERSION>_<DESCRIPTION>.sql` the
//! way `sqlx migrate add` names them. The database's current version is a
//! single row in a tracking table (`schema_version` by default). Running the
//! migrator applies every script with a greater version, in ascending order,
//! and advances the tracked version after each one.
//!
//! Each script runs in its own transaction together with its version bump,
//! unless its first line is `-- no-transaction` (needed for statements such
//! as `CREATE INDEX CONCURRENTLY`). Reversible `.down.sql` scripts are
//! ignored.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sqlx::migrate::MigrationSource;
use sqlx::postgres::PgConnection;
use sqlx::{Connection as _, PgExecutor};
use sqlx_conn_core::{Context, Error, Result};
use tracing::{error, info, warn};

use crate::database::PostgresDatabase;

/// Default directory holding versioned scripts, relative to the working
/// directory.
pub const MIGRATIONS_DIR: &str = "db/migrations";

/// Default name of the version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = "schema_version";

/// One versioned migration script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationScript {
   pub version: i64,
   pub description: String,
   pub sql: String,
   /// Run outside a transaction (`-- no-transaction` on the first line)
   pub no_tx: bool,
}

/// Outcome of one migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
   /// Version before the run (0 for a fresh database)
   pub from: i64,
   /// Version after the run
   pub to: i64,
   /// Number of scripts applied
   pub applied: usize,
}

/// Applies the scripts of one directory, tracking progress in one table.
///
/// # Examples
///
/// ```no_run
/// use sqlx_conn_core::Context;
/// use sqlx_conn_postgres::{Migrator, PostgresDatabase};
///
/// # async fn example(db: &PostgresDatabase) -> sqlx_conn_core::Result<()> {
/// let report = Migrator::new("migrations")
///    .with_table("app_schema_version")
///    .run(&Context::background(), db)
///    .await?;
/// println!("migrated from {} to {}", report.from, report.to);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Migrator {
   dir: PathBuf,
   table: String,
}

impl Default for Migrator {
   fn default() -> Self {
      Self::new(MIGRATIONS_DIR)
   }
}

impl Migrator {
   pub fn new(dir: impl Into<PathBuf>) -> Self {
      Self {
         dir: dir.into(),
         table: SCHEMA_VERSION_TABLE.to_string(),
      }
   }

   /// Track the version in `table` instead of `schema_version`.
   ///
   /// The name may be schema-qualified (`app.schema_version`). It is checked
   /// when the migrator runs.
   pub fn with_table(mut self, table: impl Into<String>) -> Self {
      self.table = table.into();
      self
   }

   pub fn dir(&self) -> &Path {
      &self.dir
   }

   pub fn table(&self) -> &str {
      &self.table
   }

   /// Load the directory's up scripts sorted by version.
   ///
   /// Fails with [`Error::Migration`] if the directory cannot be read, a
   /// file name has a non-numeric version, a version is not positive, or
   /// two scripts share a version.
   pub async fn scripts(&self) -> Result<Vec<MigrationScript>> {
      let migrations = self.dir.as_path().resolve().await.map_err(|e| {
         Error::Migration(format!(
            "failed to load migrations from {}: {e}",
            self.dir.display()
         ))
      })?;

      let mut scripts: Vec<MigrationScript> = migrations
         .into_iter()
         .filter(|m| !m.migration_type.is_down_migration())
         .map(|m| MigrationScript {
            version: m.version,
            description: m.description.into_owned(),
            sql: m.sql.into_owned(),
            no_tx: m.no_tx,
         })
         .collect();
      scripts.sort_by_key(|s| s.version);

      if let Some(script) = scripts.iter().find(|s| s.version <= 0) {
         return Err(Error::Migration(format!(
            "migration version must be positive: {} ({})",
            script.version, script.description
         )));
      }
      if let Some(pair) = scripts.windows(2).find(|w| w[0].version == w[1].version) {
         return Err(Error::Migration(format!(
            "duplicate migration version {}: {} and {}",
            pair[0].version, pair[0].description, pair[1].description
         )));
      }

      Ok(scripts)
   }

   /// Bring `db` up to the newest script version.
   ///
   /// Runs on one connection acquired from the pool and released on every
   /// path. A session advisory lock keyed on the tracking table serializes
   /// concurrent runners. Running again with no new scripts applies nothing
   /// and leaves the version unchanged.
   pub async fn run(&self, ctx: &Context, db: &PostgresDatabase) -> Result<MigrationReport> {
      let span = tracing::info_span!(
         parent: ctx.span(),
         "postgres_migrations",
         dir = %self.dir.display(),
         table = %self.table
      );
      let ctx = ctx.with_span(span);

      if !is_valid_table_name(&self.table) {
         error!(parent: ctx.span(), "Invalid schema version table name");
         return Err(Error::Migration(format!(
            "invalid schema version table name: {:?}",
            self.table
         )));
      }

      let scripts = match self.scripts().await {
         Ok(scripts) => scripts,
         Err(err) => {
            error!(parent: ctx.span(), error = %err, "Failed to load migrations");
            return Err(err);
         }
      };

      let mut conn = match ctx.run(async { Ok(db.pool().acquire().await?) }).await {
         Ok(conn) => conn,
         Err(err) => {
            error!(parent: ctx.span(), error = %err, "Failed to acquire database connection");
            return Err(err);
         }
      };

      if let Err(err) = ctx.run(lock(&mut *conn, &self.table)).await {
         error!(parent: ctx.span(), error = %err, "Failed to take migration lock");
         return Err(err);
      }

      let result = ctx.run(self.apply(&ctx, &mut *conn, &scripts)).await;

      // Outside `ctx.run`: the lock must be released even when cancelled
      if let Err(err) = unlock(&mut *conn, &self.table).await {
         warn!(parent: ctx.span(), error = %err, "Failed to release migration lock");
         // A session still holding the lock must not go back to the pool
         if let Err(err) = conn.close().await {
            warn!(parent: ctx.span(), error = %err, "Failed to close migration connection");
         }
      }

      match result {
         Ok(report) => {
            info!(
               parent: ctx.span(),
               from = report.from,
               to = report.to,
               applied = report.applied,
               "Migration success"
            );
            Ok(report)
         }
         Err(err) => {
            error!(parent: ctx.span(), error = %err, "Failed to migrate");
            Err(err)
         }
      }
   }

   async fn apply(
      &self,
      ctx: &Context,
      conn: &mut PgConnection,
      scripts: &[MigrationScript],
   ) -> Result<MigrationReport> {
      let table = &self.table;

      sqlx::raw_sql(&format!(
         "CREATE TABLE IF NOT EXISTS {table} (version BIGINT NOT NULL);
          INSERT INTO {table} (version) SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM {table});"
      ))
      .execute(&mut *conn)
      .await?;

      let from: i64 = sqlx::query_scalar(&format!("SELECT version::bigint FROM {table} LIMIT 1"))
         .fetch_one(&mut *conn)
         .await?;

      if from != 0 && !scripts.iter().any(|s| s.version == from) {
         return Err(Error::Migration(format!(
            "database is at version {from}, which has no script in {}",
            self.dir.display()
         )));
      }

      info!(parent: ctx.span(), from, "Migrating");

      let update = format!("UPDATE {table} SET version = $1");
      let mut to = from;
      let mut applied = 0;

      for script in scripts.iter().filter(|s| s.version > from) {
         info!(
            parent: ctx.span(),
            version = script.version,
            description = %script.description,
            "Applying migration"
         );

         if script.no_tx {
            sqlx::raw_sql(&script.sql).execute(&mut *conn).await?;
            sqlx::query(&update)
               .bind(script.version)
               .execute(&mut *conn)
               .await?;
         } else {
            let mut tx = conn.begin().await?;
            sqlx::raw_sql(&script.sql).execute(&mut *tx).await?;
            sqlx::query(&update)
               .bind(script.version)
               .execute(&mut *tx)
               .await?;
            tx.commit().await?;
         }

         to = script.version;
         applied += 1;
      }

      Ok(MigrationReport { from, to, applied })
   }
}

/// Apply the scripts in `db/migrations` to `db`, tracking the version in
/// `schema_version`.
pub async fn run_postgres_migrations(
   ctx: &Context,
   db: &PostgresDatabase,
) -> Result<MigrationReport> {
   Migrator::default().run(ctx, db).await
}

async fn lock<'e>(conn: impl PgExecutor<'e>, table: &str) -> Result<()> {
   sqlx::query("SELECT pg_advisory_lock(hashtext($1))")
      .bind(table)
      .execute(conn)
      .await?;
   Ok(())
}

async fn unlock<'e>(conn: impl PgExecutor<'e>, table: &str) -> Result<()> {
   sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
      .bind(table)
      .execute(conn)
      .await?;
   Ok(())
}

/// Plain or schema-qualified SQL identifier, safe to splice into statements.
fn is_valid_table_name(name: &str) -> bool {
   !name.is_empty()
      && name.split('.').all(|part| {
         let mut chars = part.chars();
         matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
      })
}
