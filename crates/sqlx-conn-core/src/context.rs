//! Cancellation, deadline and logging context passed to every operation

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::{Error, Result};

/// Execution context for a database operation.
///
/// A context bundles three things the surrounding request layer owns:
///
/// - a cancellation token, cancelled by the caller to abort in-flight work
/// - an optional deadline after which work is abandoned
/// - a tracing span that receives every log line emitted on its behalf
///
/// Contexts are cheap to clone. Derived contexts ([`Context::child`],
/// [`Context::with_timeout`]) are cancelled whenever their parent is, and a
/// derived deadline never extends the parent's.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use sqlx_conn_core::Context;
///
/// let ctx = Context::background().with_timeout(Duration::from_secs(5));
/// assert!(ctx.deadline().is_some());
/// assert!(ctx.err().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
   token: CancellationToken,
   deadline: Option<Instant>,
   span: Span,
}

impl Default for Context {
   fn default() -> Self {
      Self::background()
   }
}

impl Context {
   /// A root context: never cancelled, no deadline, logs into the current span.
   pub fn background() -> Self {
      Self {
         token: CancellationToken::new(),
         deadline: None,
         span: Span::current(),
      }
   }

   /// Derive a context that can be cancelled independently of its parent.
   pub fn child(&self) -> Self {
      Self {
         token: self.token.child_token(),
         deadline: self.deadline,
         span: self.span.clone(),
      }
   }

   /// Derive a child context that expires after `timeout`.
   pub fn with_timeout(&self, timeout: Duration) -> Self {
      self.with_deadline(Instant::now() + timeout)
   }

   /// Derive a child context that expires at `deadline`, or at the parent's
   /// deadline if that comes first.
   pub fn with_deadline(&self, deadline: Instant) -> Self {
      let mut ctx = self.child();
      ctx.deadline = Some(match self.deadline {
         Some(parent) => parent.min(deadline),
         None => deadline,
      });
      ctx
   }

   /// Derive a context whose log output goes to `span`.
   pub fn with_span(&self, span: Span) -> Self {
      Self {
         token: self.token.clone(),
         deadline: self.deadline,
         span,
      }
   }

   /// Cancel this context and every context derived from it.
   pub fn cancel(&self) {
      self.token.cancel();
   }

   pub fn is_cancelled(&self) -> bool {
      self.token.is_cancelled()
   }

   pub fn deadline(&self) -> Option<Instant> {
      self.deadline
   }

   /// The span that receives log output for this context.
   pub fn span(&self) -> &Span {
      &self.span
   }

   /// The reason this context is done, if it is.
   pub fn err(&self) -> Option<Error> {
      if self.token.is_cancelled() {
         return Some(Error::Cancelled);
      }
      match self.deadline {
         Some(deadline) if Instant::now() >= deadline => Some(Error::DeadlineExceeded),
         _ => None,
      }
   }

   /// Drive `fut` to completion unless the context is cancelled or its
   /// deadline passes first, in which case `fut` is dropped mid-flight.
   pub async fn run<F, T>(&self, fut: F) -> Result<T>
   where
      F: Future<Output = Result<T>>,
   {
      if let Some(err) = self.err() {
         return Err(err);
      }

      let deadline = async {
         match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
         }
      };

      tokio::select! {
         biased;
         _ = self.token.cancelled() => Err(Error::Cancelled),
         _ = deadline => Err(Error::DeadlineExceeded),
         result = fut.instrument(self.span.clone()) => result,
      }
   }
}
