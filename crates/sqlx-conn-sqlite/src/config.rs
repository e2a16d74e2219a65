//! Configuration for embedded SQLite databases

use std::time::Duration;

use sqlx_conn_core::FinalizePolicy;

/// Configuration for [`SqliteDatabase`](crate::SqliteDatabase) pools
///
/// # Examples
///
/// ```
/// use sqlx_conn_sqlite::SqliteDatabaseConfig;
/// use std::time::Duration;
///
/// // Use defaults
/// let config = SqliteDatabaseConfig::default();
///
/// // Override just one field
/// let config = SqliteDatabaseConfig {
///     max_connections: 2,
///     ..Default::default()
/// };
/// assert_eq!(config.busy_timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct SqliteDatabaseConfig {
   /// Maximum number of pooled connections to the database file
   ///
   /// SQLite serializes writers itself; extra connections only buy
   /// concurrent readers. In-memory databases always use exactly one
   /// connection, since every connection would otherwise see its own
   /// private database.
   ///
   /// Default: 6
   pub max_connections: u32,

   /// Idle timeout for pooled connections
   ///
   /// Ignored for in-memory databases, whose only connection is never
   /// closed while the pool is open.
   ///
   /// Default: 30 seconds
   pub idle_timeout: Duration,

   /// How long a statement waits on a locked database before failing with
   /// `SQLITE_BUSY`
   ///
   /// Default: 5 seconds
   pub busy_timeout: Duration,

   /// Create the database file if it does not exist
   ///
   /// Default: true
   pub create_if_missing: bool,

   /// Whether statement errors inside a transaction mark it for rollback
   ///
   /// Default: [`FinalizePolicy::Explicit`]
   pub finalize_policy: FinalizePolicy,
}

impl Default for SqliteDatabaseConfig {
   fn default() -> Self {
      Self {
         max_connections: 6,
         idle_timeout: Duration::from_secs(30),
         busy_timeout: Duration::from_secs(5),
         create_if_missing: true,
         finalize_policy: FinalizePolicy::Explicit,
      }
   }
}
