//! Commit records
//!
//! A [`CommitRecord`] is created once per transaction attempt and shared by
//! reference (`Arc`) with every version that attempt publishes. Flipping the
//! record from `Working` to `Committed` makes all of those versions visible
//! in one step: a reader that sees any one of them committed at sequence `s`
//! sees all of its siblings committed at `s` as well.
//!
//! The record is written exactly once, by the [`LogicalClock`](crate::LogicalClock)
//! while it holds its counter lock. Readers never lock; they load `status`
//! with acquire ordering and only then trust `sequence`.

use crate::types::Sequence;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle of a commit record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommitStatus {
    /// Published versions exist but are not yet visible
    Working = 1,
    /// All versions carrying this record are visible
    Committed = 0,
}

/// Shared stamp-and-status for one transaction attempt
#[derive(Debug)]
pub struct CommitRecord {
    sequence: AtomicU64,
    status: AtomicU8,
}

impl CommitRecord {
    /// Create a record in `Working` state
    ///
    /// `sequence` is a placeholder until commit; it is the attempt's
    /// snapshot stamp, not its commit stamp.
    pub fn working(sequence: Sequence) -> Self {
        Self {
            sequence: AtomicU64::new(sequence),
            status: AtomicU8::new(CommitStatus::Working as u8),
        }
    }

    /// Current status
    #[inline]
    pub fn status(&self) -> CommitStatus {
        if self.status.load(Ordering::Acquire) == CommitStatus::Committed as u8 {
            CommitStatus::Committed
        } else {
            CommitStatus::Working
        }
    }

    /// Check if the record has been committed
    #[inline]
    pub fn is_committed(&self) -> bool {
        self.status() == CommitStatus::Committed
    }

    /// Current sequence
    ///
    /// Only meaningful as a commit stamp once [`is_committed`](Self::is_committed)
    /// returned true.
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.sequence.load(Ordering::Acquire)
    }

    /// Check whether a reader with snapshot `snapshot` may observe this record
    #[inline]
    pub fn visible_at(&self, snapshot: Sequence) -> bool {
        self.is_committed() && self.sequence() <= snapshot
    }

    /// Stamp the record and flip it to `Committed`
    ///
    /// The sequence is stored before the status so any reader that observes
    /// `Committed` also observes the final stamp.
    pub(crate) fn mark_committed(&self, sequence: Sequence) {
        debug_assert!(!self.is_committed(), "commit record stamped twice");
        self.sequence.store(sequence, Ordering::Release);
        self.status
            .store(CommitStatus::Committed as u8, Ordering::Release);
    }
}
