//! Commit protocol hooks
//!
//! A [`CommitObserver`] is notified at fixed points of every attempt. The
//! points are chosen so tests can force interleavings deterministically
//! (for example by parking on a barrier in [`CommitObserver::after_body`])
//! instead of relying on timing. Metrics collectors use the same hooks.

use std::fmt;
use std::sync::Arc;
use strata_stm_core::{CellId, Sequence};

/// Receives commit protocol events
///
/// All methods default to no-ops. Observers run on the committing thread
/// but outside its transaction: cell operations made from a hook fail with
/// `NoTransaction`, and a run started from a hook is an independent
/// transaction. `after_validation` runs while the attempt holds every target
/// lock, so it must not start another transaction touching those cells.
pub trait CommitObserver: Send + Sync {
    /// The body finished; no lock has been taken yet
    fn after_body(&self, _snapshot: Sequence) {}

    /// All targets are locked and validated
    fn after_validation(&self, _snapshot: Sequence, _targets: usize) {}

    /// Validation failed; the attempt will restart
    fn on_conflict(&self, _cell: CellId, _committed: Sequence, _snapshot: Sequence) {}

    /// The attempt committed `writes` cells at `sequence`
    fn on_commit(&self, _sequence: Sequence, _writes: usize) {}

    /// The attempt had nothing to write and finished without a commit stamp
    fn on_read_only(&self, _snapshot: Sequence) {}
}

/// Settings for transactional runs
#[derive(Clone, Default)]
pub struct TransactionConfig {
    observers: Vec<Arc<dyn CommitObserver>>,
}

impl TransactionConfig {
    /// Config with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Registered observers
    pub fn observers(&self) -> &[Arc<dyn CommitObserver>] {
        &self.observers
    }

    pub(crate) fn notify(&self, event: impl Fn(&dyn CommitObserver)) {
        for observer in &self.observers {
            event(observer.as_ref());
        }
    }
}

impl fmt::Debug for TransactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionConfig")
            .field("observers", &self.observers.len())
            .finish()
    }
}
