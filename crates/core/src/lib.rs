//! Core types for the strata STM engine
//!
//! This crate defines the leaf types every other layer builds on:
//! - [`Sequence`] and [`CellId`]: logical timestamps and cell identities
//! - [`LogicalClock`]: the process-wide commit clock
//! - [`CommitRecord`]: the shared stamp that makes a multi-cell commit atomic
//! - [`StmError`]: the error taxonomy surfaced to transaction bodies

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod error;
pub mod record;
pub mod types;

pub use clock::LogicalClock;
pub use error::{Result, StmError};
pub use record::{CommitRecord, CommitStatus};
pub use types::{CellId, Sequence};
