//! Shared setup for tests that need a live server.

use sqlx_conn_postgres::{PostgresDatabase, PostgresDatabaseConfig};

/// Connect to `TEST_DATABASE_URL` (or `DATABASE_URL`), or `None` when
/// neither is set or the server is unreachable.
pub async fn maybe_db(config: Option<PostgresDatabaseConfig>) -> Option<PostgresDatabase> {
   let _ = tracing_subscriber::fmt().with_test_writer().try_init();

   let url = std::env::var("TEST_DATABASE_URL")
      .or_else(|_| std::env::var("DATABASE_URL"))
      .ok()?;

   PostgresDatabase::connect(&url, config).await.ok()
}

/// A table name no other test run will use.
pub fn unique_name(prefix: &str) -> String {
   format!("{prefix}_{}", uuid::Uuid::new_v4().simple())
}
