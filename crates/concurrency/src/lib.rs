//! Concurrency layer for the strata STM engine
//!
//! This crate implements the transaction engine:
//! - VersionedCell: lock-free reads over an immutable version history
//! - Transaction: snapshot reads, write-set and commute-set tracking
//! - Commit protocol: ordered locking, write validation, commute
//!   resolution, and atomic visibility through a shared commit record
//! - Context: the per-thread active transaction and the retry loop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cell;
pub mod commute;
pub mod context;
pub mod observer;
pub mod transaction;
pub mod version;

mod commit;

pub use cell::Cell;
pub use commute::{combinator, Combinator};
pub use context::{current_snapshot, in_transaction, run_transaction};
pub use observer::{CommitObserver, TransactionConfig};
pub use transaction::Transaction;
pub use version::{CellGuard, History, Value, Version, VersionedCell};
