//! The logical commit clock
//!
//! A single counter, incremented only under a short mutex, that totally
//! orders snapshots and commits. Stamping a [`CommitRecord`] happens inside
//! the same critical section, so a snapshot taken concurrently with a commit
//! either precedes the commit stamp or observes the record as committed.
//! There is no window in which a reader holds a snapshot above the commit
//! stamp while the record still reads `Working`.

use crate::record::CommitRecord;
use crate::types::Sequence;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

static GLOBAL: Lazy<LogicalClock> = Lazy::new(LogicalClock::new);

/// Process-wide monotonically increasing counter
#[derive(Debug)]
pub struct LogicalClock {
    /// Next stamp to hand out
    next: Mutex<Sequence>,
}

impl LogicalClock {
    /// Create a clock whose first stamp is 1
    pub fn new() -> Self {
        Self {
            next: Mutex::new(1),
        }
    }

    /// The clock shared by every cell and transaction in the process
    pub fn global() -> &'static LogicalClock {
        &GLOBAL
    }

    /// Hand out a fresh stamp
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_stm_core::LogicalClock;
    ///
    /// let clock = LogicalClock::new();
    /// assert_eq!(clock.next_sequence(), 1);
    /// assert_eq!(clock.next_sequence(), 2);
    /// ```
    pub fn next_sequence(&self) -> Sequence {
        let mut next = self.next.lock();
        let seq = *next;
        *next += 1;
        seq
    }

    /// Last stamp handed out (0 if none)
    pub fn current(&self) -> Sequence {
        *self.next.lock() - 1
    }

    /// Atomic commit point
    ///
    /// Takes a fresh stamp and flips `record` to committed without releasing
    /// the counter lock in between. Returns the commit stamp.
    pub fn commit(&self, record: &CommitRecord) -> Sequence {
        let mut next = self.next.lock();
        let seq = *next;
        *next += 1;
        record.mark_committed(seq);
        seq
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}
