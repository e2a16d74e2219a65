//! Deferred commit-or-rollback state shared by the engine adapters

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Database;
use tracing::{debug, warn};

use crate::{Context, Error, Result};

/// Lifecycle of a transaction. `Committed` and `RolledBack` are terminal
/// and record that finalization was attempted, not that it succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxState {
   Open,
   Committed,
   RolledBack,
}

/// Whether a failed statement inside a transaction marks it for rollback on
/// its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FinalizePolicy {
   /// Only [`FinalizeFlag::fail`] and [`FinalizeFlag::record`] mark the transaction.
   #[default]
   Explicit,
   /// Any statement error returned through the transaction also marks it.
   RecordStatementErrors,
}

/// The commit-or-rollback flag of one transaction.
///
/// Handed out by [`TxScope::split`] next to the native connection, so a
/// statement's outcome can be recorded while its cursor still borrows the
/// connection.
#[derive(Debug)]
pub struct FinalizeFlag {
   failure: Option<String>,
   policy: FinalizePolicy,
   ctx: Context,
}

impl FinalizeFlag {
   /// Mark the transaction for rollback. The first recorded failure wins.
   pub fn fail(&mut self, reason: impl Display) {
      if self.failure.is_none() {
         debug!(parent: self.ctx.span(), reason = %reason, "transaction marked for rollback");
         self.failure = Some(reason.to_string());
      }
   }

   /// Mark the transaction for rollback if `result` is an error, then hand
   /// the result back unchanged.
   pub fn record<T>(&mut self, result: Result<T>) -> Result<T> {
      if let Err(err) = &result {
         self.fail(err);
      }
      result
   }

   /// Apply the finalize policy to the outcome of a statement.
   pub fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
      match self.policy {
         FinalizePolicy::Explicit => result,
         FinalizePolicy::RecordStatementErrors => self.record(result),
      }
   }

   pub fn failure(&self) -> Option<&str> {
      self.failure.as_deref()
   }

   pub fn policy(&self) -> FinalizePolicy {
      self.policy
   }
}

/// One open transaction plus its finalization flag.
///
/// The adapters wrap a `TxScope` in their transactional connection type and
/// call [`TxScope::finalize`] from `close`. Finalization commits when no
/// failure was recorded and rolls back otherwise; commit or rollback errors
/// are logged on the span of the context captured at `begin` and are not
/// reported to the caller.
///
/// A scope dropped without being finalized rolls back.
#[must_use = "if unused, the transaction is immediately rolled back"]
pub struct TxScope<DB: Database> {
   tx: Option<sqlx::Transaction<'static, DB>>,
   flag: FinalizeFlag,
   state: TxState,
}

impl<DB: Database> TxScope<DB> {
   pub fn new(tx: sqlx::Transaction<'static, DB>, ctx: Context, policy: FinalizePolicy) -> Self {
      Self {
         tx: Some(tx),
         flag: FinalizeFlag {
            failure: None,
            policy,
            ctx,
         },
         state: TxState::Open,
      }
   }

   /// The native connection the transaction runs on, together with the
   /// flag that decides how it ends.
   pub fn split(&mut self) -> Result<(&mut DB::Connection, &mut FinalizeFlag)> {
      match self.tx.as_mut() {
         Some(tx) => Ok((&mut **tx, &mut self.flag)),
         None => Err(Error::TransactionAlreadyFinalized),
      }
   }

   pub fn flag(&mut self) -> &mut FinalizeFlag {
      &mut self.flag
   }

   /// Mark the transaction for rollback.
   pub fn fail(&mut self, reason: impl Display) {
      self.flag.fail(reason);
   }

   /// Mark the transaction for rollback if `result` is an error.
   pub fn record<T>(&mut self, result: Result<T>) -> Result<T> {
      self.flag.record(result)
   }

   /// The recorded failure, if any.
   pub fn failure(&self) -> Option<&str> {
      self.flag.failure()
   }

   pub fn state(&self) -> TxState {
      self.state
   }

   pub fn context(&self) -> &Context {
      &self.flag.ctx
   }

   /// Commit or roll back, exactly once. Later calls return the terminal
   /// state without touching the database.
   pub async fn finalize(&mut self) -> TxState {
      let Some(tx) = self.tx.take() else {
         return self.state;
      };
      let ctx = &self.flag.ctx;

      if let Some(reason) = &self.flag.failure {
         self.state = TxState::RolledBack;
         match ctx.run(async { Ok(tx.rollback().await?) }).await {
            Ok(()) => debug!(parent: ctx.span(), reason = %reason, "transaction rolled back"),
            Err(err) => {
               warn!(parent: ctx.span(), error = %err, "failed to rollback transaction")
            }
         }
      } else {
         self.state = TxState::Committed;
         match ctx.run(async { Ok(tx.commit().await?) }).await {
            Ok(()) => debug!(parent: ctx.span(), "transaction committed"),
            Err(err) => {
               warn!(parent: ctx.span(), error = %err, "failed to commit transaction")
            }
         }
      }

      self.state
   }
}

impl<DB: Database> Drop for TxScope<DB> {
   fn drop(&mut self) {
      // Dropping the sqlx transaction queues a ROLLBACK on its connection.
      if self.tx.is_some() {
         debug!(
            parent: self.flag.ctx.span(),
            "transaction dropped without close (will auto-rollback)"
         );
      }
   }
}

impl<DB: Database> std::fmt::Debug for TxScope<DB> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("TxScope")
         .field("state", &self.state)
         .field("flag", &self.flag)
         .finish()
   }
}
