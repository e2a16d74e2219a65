//! Configuration for pooled PostgreSQL databases

use std::time::Duration;

use sqlx_conn_core::FinalizePolicy;

/// Configuration for [`PostgresDatabase`](crate::PostgresDatabase) pools
///
/// # Examples
///
/// ```
/// use sqlx_conn_postgres::PostgresDatabaseConfig;
/// use std::time::Duration;
///
/// let config = PostgresDatabaseConfig {
///     max_connections: 4,
///     acquire_timeout: Duration::from_secs(5),
///     ..Default::default()
/// };
/// assert_eq!(config.min_connections, 0);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresDatabaseConfig {
   /// Maximum number of pooled server connections
   ///
   /// Default: 10
   pub max_connections: u32,

   /// Connections kept open even when idle
   ///
   /// Default: 0
   pub min_connections: u32,

   /// How long `begin` and statements wait for a free connection
   ///
   /// Default: 30 seconds
   pub acquire_timeout: Duration,

   /// Idle timeout for pooled connections
   ///
   /// Default: 10 minutes
   pub idle_timeout: Duration,

   /// Whether statement errors inside a transaction mark it for rollback
   ///
   /// Default: [`FinalizePolicy::Explicit`]
   pub finalize_policy: FinalizePolicy,
}

impl Default for PostgresDatabaseConfig {
   fn default() -> Self {
      Self {
         max_connections: 10,
         min_connections: 0,
         acquire_timeout: Duration::from_secs(30),
         idle_timeout: Duration::from_secs(600),
         finalize_policy: FinalizePolicy::Explicit,
      }
   }
}
