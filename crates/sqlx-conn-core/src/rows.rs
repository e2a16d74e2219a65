//! Single-owner cursor over a streamed result set

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::de::DeserializeOwned;

use crate::{Context, Error, Record, Result};

/// Cursor over zero or more records.
///
/// Adapters build a `Rows` from their native row stream with
/// [`Rows::open`], which fetches the first row eagerly so that a statement
/// the engine rejects fails the query call itself rather than the first
/// `next`.
///
/// The cursor borrows its connection for `'c`. Dropping it (or calling
/// [`Rows::close`]) releases the underlying statement; the connection is
/// usable again only once the cursor is gone.
///
/// ## Usage Pattern
///
/// ```text
/// let mut rows = conn.query(&ctx, "SELECT id FROM t", vec![]).await?;
/// while rows.next().await {
///    let (id,): (i64,) = rows.scan()?;
/// }
/// if let Some(err) = rows.err() { ... }
/// rows.close();
/// ```
pub struct Rows<'c> {
   stream: Option<BoxStream<'c, Result<Record>>>,
   peeked: Option<Record>,
   current: Option<Record>,
   err: Option<Error>,
   ctx: Context,
}

impl<'c> Rows<'c> {
   /// Open a cursor over `stream`, fetching the first item under `ctx`.
   ///
   /// Returns the first item's error, if any, instead of a cursor.
   pub async fn open(ctx: &Context, mut stream: BoxStream<'c, Result<Record>>) -> Result<Self> {
      let first = ctx.run(async { stream.next().await.transpose() }).await?;
      let stream = first.is_some().then_some(stream);

      Ok(Self {
         stream,
         peeked: first,
         current: None,
         err: None,
         ctx: ctx.clone(),
      })
   }

   /// Advance to the next record. Returns `false` once the result set is
   /// exhausted or an error occurred; check [`Rows::err`] to tell them apart.
   pub async fn next(&mut self) -> bool {
      match self.try_next().await {
         Ok(Some(record)) => {
            self.current = Some(record);
            true
         }
         Ok(None) => {
            self.current = None;
            false
         }
         Err(err) => {
            self.current = None;
            self.err = Some(err);
            false
         }
      }
   }

   /// Fetch the next record, if any. Does not touch the current position
   /// used by [`Rows::scan`].
   pub async fn try_next(&mut self) -> Result<Option<Record>> {
      if let Some(record) = self.peeked.take() {
         return Ok(Some(record));
      }

      let Some(stream) = self.stream.as_mut() else {
         return Ok(None);
      };

      match self.ctx.run(async { stream.next().await.transpose() }).await {
         Ok(Some(record)) => Ok(Some(record)),
         Ok(None) => {
            self.stream = None;
            Ok(None)
         }
         Err(err) => {
            self.stream = None;
            Err(err)
         }
      }
   }

   /// The record at the current position.
   pub fn record(&self) -> Option<&Record> {
      self.current.as_ref()
   }

   /// Scan the current record positionally into `T`.
   ///
   /// Fails with [`Error::NoRows`] when there is no current record (before
   /// the first `next`, or after the cursor is exhausted).
   pub fn scan<T: DeserializeOwned>(&self) -> Result<T> {
      self.current.as_ref().ok_or(Error::NoRows)?.scan()
   }

   /// Decode the current record by column name into `T`.
   pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
      self.current.as_ref().ok_or(Error::NoRows)?.decode()
   }

   /// The error that ended iteration, if any.
   pub fn err(&self) -> Option<&Error> {
      self.err.as_ref()
   }

   /// Drain the remaining records into a vector.
   pub async fn collect(mut self) -> Result<Vec<Record>> {
      let mut records = Vec::new();
      while let Some(record) = self.try_next().await? {
         records.push(record);
      }
      Ok(records)
   }

   /// Release the cursor. Returns the error that ended iteration, if any.
   pub fn close(mut self) -> Result<()> {
      self.stream = None;
      match self.err.take() {
         Some(err) => Err(err),
         None => Ok(()),
      }
   }
}

impl std::fmt::Debug for Rows<'_> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Rows")
         .field("open", &self.stream.is_some())
         .field("current", &self.current)
         .field("err", &self.err)
         .finish()
   }
}
