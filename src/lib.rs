//! # strata-stm
//!
//! In-process software transactional memory.
//!
//! Threads read and write shared [`Cell`]s inside atomic transactions.
//! Reads see a consistent snapshot and never block. Writes are validated
//! and published at commit: every cell a transaction wrote becomes visible
//! at once, or the transaction re-runs from the top.
//!
//! ## Quick Start
//!
//! ```ignore
//! use strata_stm::prelude::*;
//!
//! let checking = Cell::new(100i64);
//! let savings = Cell::new(0i64);
//!
//! atomically(|| {
//!     let amount = checking.get()?;
//!     checking.set(0)?;
//!     savings.commute(move |s| s + amount)
//! })?;
//! ```
//!
//! ## Operations
//!
//! Inside a transaction:
//!
//! - [`Cell::get`] - read at the snapshot (or the pending write)
//! - [`Cell::set`] - record a write, validated at commit
//! - [`Cell::touch`] - validate a cell at commit without changing it
//! - [`Cell::commute`] - apply a function to the latest value at commit,
//!   without validation
//!
//! A cell cannot be both set and commuted in one transaction.
//!
//! ## Guarantees
//!
//! - Snapshot reads: a transaction sees exactly the commits stamped at or
//!   before its snapshot.
//! - Atomic visibility: all writes of a commit share one commit record and
//!   become visible together.
//! - No deadlock: commit locks are taken in cell creation order.
//! - Unbounded retry: a transaction whose written cells changed after its
//!   snapshot restarts with a fresh snapshot until it commits.

#![warn(missing_docs)]

mod error;
mod stm;

pub mod prelude;

// Re-export main entry points
pub use error::{Error, Result};
pub use stm::{atomically, MetricsSnapshot, Stm, StmBuilder, StmMetrics};

// Re-export cells and hooks
pub use strata_stm_concurrency::{current_snapshot, in_transaction, Cell, CommitObserver};

// Re-export core types
pub use strata_stm_core::{CellId, Sequence};
