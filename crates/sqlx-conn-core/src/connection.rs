//! The capability set shared by root connections and transactions

use std::future::Future;

use serde_json::Value as JsonValue;

use crate::{Context, ExecResult, Result, Row, Rows};

/// A handle that can run parameterized statements and start transactions.
///
/// Every engine adapter implements this for two kinds of handle:
///
/// - **root**: owns the pool or file handle; [`Connection::close`] releases it
/// - **transactional**: owns one open transaction; `close` commits or rolls
///   back and never releases the underlying resource
///
/// Callers can write code generic over `C: Connection` and hand it either.
///
/// ## Re-entrant transactions
///
/// `begin` on a transactional handle returns the same transaction as
/// `&mut Self`. The blanket implementation for `&mut C` makes that borrow a
/// connection in its own right whose `close` does nothing, so nested code
/// can follow the same begin/close discipline while only the outermost
/// owner finalizes.
///
/// ## Arguments
///
/// Arguments bind positionally to the engine's native placeholders
/// (`$1`, `$2`, ...; SQLite also accepts `?`). A statement run with no
/// arguments goes through the engine's simple query path and may contain
/// several `;`-separated statements.
///
/// ## Concurrency
///
/// Operations on one handle run in call order. Root handles are `Clone` and
/// may be shared across tasks. A transaction is driven through `&mut`, so it
/// cannot be used from two tasks at once.
pub trait Connection: Send {
   /// Handle returned by [`Connection::begin`].
   type Transaction<'c>: Connection + 'c
   where
      Self: 'c;

   /// Run a statement that produces no row set.
   fn exec(
      &mut self,
      ctx: &Context,
      query: &str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Result<ExecResult>> + Send;

   /// Run a statement producing zero or more rows.
   ///
   /// Fails immediately if the engine rejects the statement; no cursor is
   /// returned in that case.
   fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Result<Rows<'c>>> + Send;

   /// Run a statement expected to produce at most one row.
   ///
   /// Never fails itself: errors, including "no rows", surface when the
   /// returned [`Row`] is scanned.
   fn query_row(
      &mut self,
      ctx: &Context,
      query: &str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Row> + Send;

   /// Start a transaction. On a transactional handle this returns the same
   /// transaction and never fails.
   fn begin(&mut self, ctx: &Context) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send;

   /// Release a root handle, or finalize a transactional one.
   fn close(self) -> impl Future<Output = ()> + Send;
}

impl<C: Connection> Connection for &mut C {
   type Transaction<'c>
      = C::Transaction<'c>
   where
      Self: 'c;

   fn exec(
      &mut self,
      ctx: &Context,
      query: &str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Result<ExecResult>> + Send {
      (**self).exec(ctx, query, args)
   }

   fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Result<Rows<'c>>> + Send {
      (**self).query(ctx, query, args)
   }

   fn query_row(
      &mut self,
      ctx: &Context,
      query: &str,
      args: Vec<JsonValue>,
   ) -> impl Future<Output = Row> + Send {
      (**self).query_row(ctx, query, args)
   }

   fn begin(&mut self, ctx: &Context) -> impl Future<Output = Result<Self::Transaction<'_>>> + Send {
      (**self).begin(ctx)
   }

   /// A borrowed handle owns nothing, so closing it is a no-op.
   fn close(self) -> impl Future<Output = ()> + Send {
      std::future::ready(())
   }
}
