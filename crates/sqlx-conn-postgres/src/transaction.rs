//! Transactional connection for PostgreSQL

use futures::StreamExt;
use serde_json::Value as JsonValue;
use sqlx::{Executor, Postgres};
use sqlx_conn_core::{
   Connection, Context, ExecResult, FinalizePolicy, Result, Row, Rows, TxScope, TxState,
};

use crate::bind::bind_all;
use crate::decode;

/// An open PostgreSQL transaction behaving as a [`Connection`].
///
/// Holds one pooled connection from `BEGIN` until [`Connection::close`],
/// which commits unless a failure was recorded. `begin` on a transaction
/// returns `&mut self`, so nested code joins this transaction. Dropping it
/// unclosed rolls back and returns the connection to the pool.
#[must_use = "if unused, the transaction is immediately rolled back"]
#[derive(Debug)]
pub struct PostgresTransaction {
   scope: TxScope<Postgres>,
}

impl PostgresTransaction {
   pub(crate) fn new(
      tx: sqlx::Transaction<'static, Postgres>,
      ctx: Context,
      policy: FinalizePolicy,
   ) -> Self {
      Self {
         scope: TxScope::new(tx, ctx, policy),
      }
   }

   /// Mark the transaction for rollback on close.
   pub fn fail(&mut self, reason: impl std::fmt::Display) {
      self.scope.fail(reason);
   }

   pub fn record<T>(&mut self, result: Result<T>) -> Result<T> {
      self.scope.record(result)
   }

   pub fn failure(&self) -> Option<&str> {
      self.scope.failure()
   }

   pub fn state(&self) -> TxState {
      self.scope.state()
   }

   /// Finalize and report whether a commit or a rollback was attempted.
   pub async fn finish(mut self) -> TxState {
      self.scope.finalize().await
   }
}

impl Connection for PostgresTransaction {
   type Transaction<'c> = &'c mut PostgresTransaction;

   async fn exec(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Result<ExecResult> {
      let (conn, flag) = self.scope.split()?;
      let result = ctx
         .run(async {
            let result = if args.is_empty() {
               Executor::execute(&mut *conn, sqlx::raw_sql(query)).await?
            } else {
               Executor::execute(&mut *conn, bind_all(sqlx::query(query), args)).await?
            };
            Ok(ExecResult {
               rows_affected: result.rows_affected(),
               last_insert_id: None,
            })
         })
         .await;
      flag.observe(result)
   }

   async fn query<'c>(
      &'c mut self,
      ctx: &Context,
      query: &'c str,
      args: Vec<JsonValue>,
   ) -> Result<Rows<'c>> {
      let (conn, flag) = self.scope.split()?;
      let stream = bind_all(sqlx::query(query), args)
         .fetch(conn)
         .map(|row| decode::to_record(&row?))
         .boxed();
      flag.observe(Rows::open(ctx, stream).await)
   }

   async fn query_row(&mut self, ctx: &Context, query: &str, args: Vec<JsonValue>) -> Row {
      let (conn, flag) = match self.scope.split() {
         Ok(parts) => parts,
         Err(err) => return Row::new(Err(err)),
      };
      let result = ctx
         .run(async {
            let row = bind_all(sqlx::query(query), args)
               .fetch_optional(&mut *conn)
               .await?;
            row.as_ref().map(decode::to_record).transpose()
         })
         .await;
      Row::new(flag.observe(result))
   }

   async fn begin(&mut self, _ctx: &Context) -> Result<&mut PostgresTransaction> {
      Ok(self)
   }

   async fn close(mut self) {
      self.scope.finalize().await;
   }
}
