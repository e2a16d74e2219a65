/// Result type alias for connection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by every engine adapter.
///
/// Native driver failures pass through untouched as [`Error::Sqlx`]; the only
/// normalization applied is that a native "row not found" becomes
/// [`Error::NoRows`], so callers never branch on engine identity.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(sqlx::Error),

   /// A scan found no current record.
   #[error("no rows in result set")]
   NoRows,

   /// Migration file was empty or whitespace-only.
   #[error("empty migration file: {0}")]
   EmptyMigrationScript(String),

   /// Migration scripts could not be loaded or applied.
   #[error("migration failed: {0}")]
   Migration(String),

   /// The context was cancelled before the operation finished.
   #[error("operation cancelled")]
   Cancelled,

   /// The context deadline elapsed before the operation finished.
   #[error("deadline exceeded")]
   DeadlineExceeded,

   /// Foreign key enforcement could not be enabled at open time.
   #[error("foreign key enforcement could not be enabled for {0}")]
   ForeignKeysUnavailable(String),

   /// Database type that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// A record could not be decoded into the requested type.
   #[error("decode error: {0}")]
   Decode(String),

   /// Column index or name does not exist in the record.
   #[error("column not found: {0}")]
   ColumnNotFound(String),

   /// Transaction has already been committed or rolled back.
   #[error("transaction has already been finalized (committed or rolled back)")]
   TransactionAlreadyFinalized,

   /// Unrecognized connection URL.
   #[error("unsupported database url: {0}")]
   UnsupportedUrl(String),

   /// I/O error when accessing database or migration files.
   #[error("io error: {0}")]
   Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
   fn from(err: sqlx::Error) -> Self {
      match err {
         sqlx::Error::RowNotFound => Error::NoRows,
         other => Error::Sqlx(other),
      }
   }
}

impl From<serde_json::Error> for Error {
   fn from(err: serde_json::Error) -> Self {
      Error::Decode(err.to_string())
   }
}

impl Error {
   /// True when a scan found no current record.
   pub fn is_no_rows(&self) -> bool {
      matches!(self, Error::NoRows)
   }

   /// True for cancellation and deadline expiry.
   pub fn is_cancellation(&self) -> bool {
      matches!(self, Error::Cancelled | Error::DeadlineExceeded)
   }

   /// Extract a structured error code from the error type.
   ///
   /// Database errors carry the engine's own code (SQLite result code or
   /// PostgreSQL SQLSTATE) as `DATABASE_<code>`.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("DATABASE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::NoRows => "NO_ROWS".to_string(),
         Error::EmptyMigrationScript(_) => "EMPTY_MIGRATION_SCRIPT".to_string(),
         Error::Migration(_) => "MIGRATION_FAILED".to_string(),
         Error::Cancelled => "CANCELLED".to_string(),
         Error::DeadlineExceeded => "DEADLINE_EXCEEDED".to_string(),
         Error::ForeignKeysUnavailable(_) => "FOREIGN_KEYS_UNAVAILABLE".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::Decode(_) => "DECODE_ERROR".to_string(),
         Error::ColumnNotFound(_) => "COLUMN_NOT_FOUND".to_string(),
         Error::TransactionAlreadyFinalized => "TRANSACTION_ALREADY_FINALIZED".to_string(),
         Error::UnsupportedUrl(_) => "UNSUPPORTED_URL".to_string(),
         Error::Io(_) => "IO_ERROR".to_string(),
      }
   }
}
