//! Versioned cells
//!
//! A [`VersionedCell`] keeps its whole value history as an immutable,
//! newest-first chain of [`Version`]s. Each version points at the
//! [`CommitRecord`] of the attempt that published it, so a version's
//! visibility is decided by that shared record, not by the version itself.
//!
//! # Thread Safety
//!
//! - Readers load `head` lock-free and walk the chain; they never block.
//! - Only a committer holding the cell's [`CellGuard`] may prepend.
//! - A `Working` head is always skipped by readers: its record will be
//!   stamped with a sequence greater than any snapshot already issued.

use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use strata_stm_core::{CellId, CommitRecord, LogicalClock, Sequence};

/// Type-erased cell value
pub type Value = Arc<dyn Any + Send + Sync>;

/// One immutable value ever held by a cell
pub struct Version {
    value: Value,
    record: Arc<CommitRecord>,
    prior: Option<Arc<Version>>,
}

impl Version {
    /// The stored value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Commit record shared with sibling versions of the same attempt
    pub fn record(&self) -> &CommitRecord {
        &self.record
    }

    /// Sequence of the owning record
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.record.sequence()
    }

    /// Check if the owning attempt has committed
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.record.is_committed()
    }

    /// The version this one replaced
    pub fn prior(&self) -> Option<&Arc<Version>> {
        self.prior.as_ref()
    }
}

impl Drop for Version {
    // Unlink iteratively; a recursive drop of a long history overflows the stack.
    fn drop(&mut self) {
        let mut next = self.prior.take();
        while let Some(version) = next {
            match Arc::try_unwrap(version) {
                Ok(mut version) => next = version.prior.take(),
                Err(_) => break,
            }
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("sequence", &self.sequence())
            .field("status", &self.record.status())
            .field("has_prior", &self.prior.is_some())
            .finish()
    }
}

/// Iterator over a cell's history, newest first
pub struct History {
    next: Option<Arc<Version>>,
}

impl Iterator for History {
    type Item = Arc<Version>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.prior.clone();
        Some(current)
    }
}

/// A mutable reference whose values form a versioned history
pub struct VersionedCell {
    id: CellId,
    head: ArcSwapOption<Version>,
    /// Held only during the commit phase
    lock: Mutex<()>,
}

impl VersionedCell {
    /// Create a cell with no history
    pub fn new() -> Self {
        Self {
            id: CellId::next(),
            head: ArcSwapOption::empty(),
            lock: Mutex::new(()),
        }
    }

    /// Create a cell whose first value is committed immediately
    ///
    /// The value gets its own commit record, stamped by `clock`.
    pub fn with_committed(value: Value, clock: &LogicalClock) -> Self {
        let cell = Self::new();
        cell.commit_standalone(value, clock);
        cell
    }

    /// Publish and commit `value` under a record of its own
    ///
    /// Used outside any transaction. Returns the commit stamp.
    pub fn commit_standalone(&self, value: Value, clock: &LogicalClock) -> Sequence {
        let record = Arc::new(CommitRecord::working(clock.current()));
        let guard = self.lock();
        guard.publish(value, Arc::clone(&record));
        clock.commit(&record)
    }

    /// Creation-order identity
    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    /// Walk the history from the newest published version
    pub fn history(&self) -> History {
        History {
            next: self.head.load_full(),
        }
    }

    /// Number of published versions, committed or not
    pub fn history_len(&self) -> usize {
        self.history().count()
    }

    /// Latest committed version, skipping in-flight ones
    ///
    /// Returns `None` if no value was ever committed.
    pub fn current_committed(&self) -> Option<Arc<Version>> {
        self.history().find(|version| version.is_committed())
    }

    /// The version that was current when `snapshot` was taken
    ///
    /// Returns `None` if the cell had no committed value by then.
    pub fn visible_as_of(&self, snapshot: Sequence) -> Option<Arc<Version>> {
        self.history()
            .find(|version| version.record.visible_at(snapshot))
    }

    /// Acquire the commit lock (blocking)
    pub fn lock(&self) -> CellGuard<'_> {
        CellGuard {
            cell: self,
            _lock: self.lock.lock(),
        }
    }
}

impl Default for VersionedCell {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VersionedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedCell")
            .field("id", &self.id)
            .field("head", &self.head.load_full())
            .finish()
    }
}

/// Proof that the holder owns a cell's commit lock
///
/// Publishing is only possible through a guard. The lock is released when
/// the guard is dropped.
pub struct CellGuard<'a> {
    cell: &'a VersionedCell,
    _lock: MutexGuard<'a, ()>,
}

impl<'a> CellGuard<'a> {
    /// The locked cell
    pub fn cell(&self) -> &'a VersionedCell {
        self.cell
    }

    /// Prepend a new version carrying `record`
    ///
    /// The version stays invisible to readers until `record` is committed.
    pub fn publish(&self, value: Value, record: Arc<CommitRecord>) {
        let prior = self.cell.head.load_full();
        self.cell.head.store(Some(Arc::new(Version {
            value,
            record,
            prior,
        })));
    }
}
