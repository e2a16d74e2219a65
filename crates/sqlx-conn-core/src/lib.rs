//! # sqlx-conn-core
//!
//! Engine-neutral building blocks shared by the `sqlx-conn` adapters.
//!
//! ## Core Types
//!
//! - **[`Connection`]**: exec / query / query_row / begin / close, implemented
//!   alike by root handles and transactions
//! - **[`Context`]**: cancellation token, deadline and tracing span passed to
//!   every operation
//! - **[`ExecResult`]**, **[`Row`]**, **[`Rows`]**, **[`Record`]**: write
//!   outcomes, single-row results, cursors and decoded rows
//! - **[`TxScope`]**: deferred commit-or-rollback state used by each adapter's
//!   transaction type
//! - **[`Error`]**: error type with the normalized [`Error::NoRows`] kind

mod connection;
mod context;
mod error;
mod record;
mod rows;
mod transaction;

pub use connection::Connection;
pub use context::Context;
pub use error::{Error, Result};
pub use record::{ExecResult, Record, Row};
pub use rows::Rows;
pub use transaction::{FinalizeFlag, FinalizePolicy, TxScope, TxState};

/// Convenience re-export so callers can build argument lists without a
/// direct `serde_json` dependency.
pub use serde_json::{Value as JsonValue, json};
