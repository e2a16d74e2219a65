//! Single-script schema migrations for embedded databases

use std::path::Path;

use sqlx_conn_core::{Connection, Context, Error, Result};
use tracing::{error, info};

/// Apply the SQL script at `path` to `conn` as one batch.
///
/// The file is read whole and trimmed. A blank or whitespace-only file
/// fails with [`Error::EmptyMigrationScript`] before anything is sent to the
/// database. Otherwise the script runs through [`Connection::exec`] with no
/// arguments, so it may contain any number of statements; the first failing
/// statement aborts the rest. Whether earlier statements stick is up to the
/// script: wrap it in `BEGIN; ... COMMIT;` to make it all-or-nothing.
///
/// `conn` may be a root database or an open transaction.
pub async fn run_sqlite_migrations<C: Connection>(
   ctx: &Context,
   conn: &mut C,
   path: impl AsRef<Path>,
) -> Result<()> {
   let path = path.as_ref();
   let span = tracing::info_span!(parent: ctx.span(), "sqlite_migrations", path = %path.display());
   let ctx = ctx.with_span(span);

   let script = match ctx.run(async { Ok(tokio::fs::read_to_string(path).await?) }).await {
      Ok(script) => script,
      Err(err) => {
         error!(parent: ctx.span(), error = %err, "Failed to read migrations file");
         return Err(err);
      }
   };

   let queries = script.trim();
   if queries.is_empty() {
      error!(parent: ctx.span(), "Empty migration file");
      return Err(Error::EmptyMigrationScript(path.display().to_string()));
   }

   if let Err(err) = conn.exec(&ctx, queries, vec![]).await {
      error!(parent: ctx.span(), error = %err, "Failed to execute migrations");
      return Err(err);
   }

   info!(parent: ctx.span(), "Migration success");
   Ok(())
}
