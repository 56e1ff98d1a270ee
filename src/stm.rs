//! Main entry point for running transactions.
//!
//! This module provides the `Stm` handle, its builder, and the metrics it
//! collects about commits and retries.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strata_stm_concurrency::{run_transaction, CommitObserver, TransactionConfig};
use strata_stm_core::{CellId, Sequence, StmError};

static DEFAULT: Lazy<Stm> = Lazy::new(Stm::new);

/// A transaction runner.
///
/// All handles share the process-wide clock, so cells can be used freely
/// across handles. A handle carries configuration (observers) and its own
/// metrics.
///
/// # Example
///
/// ```ignore
/// use strata_stm::prelude::*;
///
/// let stm = Stm::new();
/// let balance = Cell::new(100i64);
///
/// stm.run(|| {
///     let current = balance.get()?;
///     balance.set(current - 30)
/// })?;
///
/// assert_eq!(balance.latest(), Some(70));
/// assert_eq!(stm.metrics().commits, 1);
/// ```
pub struct Stm {
    config: TransactionConfig,
    metrics: Arc<StmMetrics>,
}

impl Stm {
    /// Create a handle with default settings.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for handle configuration.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let stm = Stm::builder()
    ///     .observer(Arc::new(MyObserver))
    ///     .build();
    /// ```
    pub fn builder() -> StmBuilder {
        StmBuilder::new()
    }

    /// The process-wide handle used by [`atomically`].
    pub fn global() -> &'static Stm {
        &DEFAULT
    }

    /// Run `body` as a transaction.
    ///
    /// The body is re-executed from the top whenever its attempt fails
    /// validation, so it must be free of side effects other than cell
    /// operations. If the calling thread is already inside a transaction,
    /// the body joins it instead of starting a new one.
    pub fn run<R, E, F>(&self, body: F) -> std::result::Result<R, E>
    where
        F: FnMut() -> std::result::Result<R, E>,
        E: From<StmError>,
    {
        run_transaction(&self.config, body)
    }

    /// Get a snapshot of this handle's metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Get the transaction configuration.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }
}

impl Default for Stm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stm")
            .field("config", &self.config)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

/// Run `body` as a transaction on the process-wide handle.
///
/// # Example
///
/// ```ignore
/// let counter = Cell::new(0u64);
/// atomically(|| counter.commute(|n| n + 1))?;
/// ```
pub fn atomically<R, F>(body: F) -> Result<R>
where
    F: FnMut() -> Result<R>,
{
    Stm::global().run(body)
}

/// Builder for [`Stm`] configuration.
#[derive(Default)]
pub struct StmBuilder {
    observers: Vec<Arc<dyn CommitObserver>>,
}

impl StmBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for commit protocol events.
    ///
    /// Observers run in registration order, after the handle's metrics.
    pub fn observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the handle.
    pub fn build(self) -> Stm {
        let metrics = Arc::new(StmMetrics::default());
        let mut config = TransactionConfig::new().with_observer(metrics.clone());
        for observer in self.observers {
            config = config.with_observer(observer);
        }
        Stm { config, metrics }
    }
}

/// Commit and retry counters for one [`Stm`] handle.
#[derive(Debug, Default)]
pub struct StmMetrics {
    commits: AtomicU64,
    read_only: AtomicU64,
    conflicts: AtomicU64,
    cells_written: AtomicU64,
    last_commit: AtomicU64,
}

impl StmMetrics {
    /// Read all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            read_only: self.read_only.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            cells_written: self.cells_written.load(Ordering::Relaxed),
            last_commit: self.last_commit.load(Ordering::Relaxed),
        }
    }
}

impl CommitObserver for StmMetrics {
    fn on_conflict(&self, _cell: CellId, _committed: Sequence, _snapshot: Sequence) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    fn on_commit(&self, sequence: Sequence, writes: usize) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.cells_written
            .fetch_add(writes as u64, Ordering::Relaxed);
        self.last_commit.fetch_max(sequence, Ordering::Relaxed);
    }

    fn on_read_only(&self, _snapshot: Sequence) {
        self.read_only.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of [`StmMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Attempts that committed at least one cell
    pub commits: u64,
    /// Transactions that finished without writing
    pub read_only: u64,
    /// Attempts restarted after failing validation
    pub conflicts: u64,
    /// Total cells published by committed attempts
    pub cells_written: u64,
    /// Highest commit sequence seen (0 if none)
    pub last_commit: Sequence,
}
