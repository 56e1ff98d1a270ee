//! Transaction state for one attempt
//!
//! A [`Transaction`] holds the attempt's snapshot, its commit record and the
//! pending effects recorded by the body:
//! - the write-set: cell -> value, last write wins
//! - the commute-set: cell -> functions, in registration order
//!
//! A cell may appear in one set or the other, never both. Pending sets are
//! keyed by [`CellId`], so iterating them yields cells in lock order.

use crate::commit::{PendingSet, PendingWrite};
use crate::commute::{Combinator, PendingCommute};
use crate::version::{Value, VersionedCell};
use std::sync::Arc;
use strata_stm_core::{CommitRecord, LogicalClock, Result, Sequence, StmError};

/// State of one transactional attempt
#[derive(Debug)]
pub struct Transaction {
    record: Arc<CommitRecord>,
    snapshot: Sequence,
    pending: PendingSet,
}

impl Transaction {
    /// Begin an attempt with a fresh snapshot from `clock`
    pub fn begin(clock: &LogicalClock) -> Self {
        let snapshot = clock.next_sequence();
        Self {
            record: Arc::new(CommitRecord::working(snapshot)),
            snapshot,
            pending: PendingSet::default(),
        }
    }

    /// Snapshot sequence: commits at or below it are visible to reads
    #[inline]
    pub fn snapshot(&self) -> Sequence {
        self.snapshot
    }

    /// Commit record shared by every version this attempt publishes
    #[cfg(test)]
    pub(crate) fn record(&self) -> &Arc<CommitRecord> {
        &self.record
    }

    /// Check if the attempt has recorded any write or commute
    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Read a cell
    ///
    /// Returns the pending value if the cell was written in this attempt,
    /// otherwise the value visible at the snapshot.
    ///
    /// # Errors
    ///
    /// [`StmError::VersionNotFound`] if the cell had no committed value when
    /// the snapshot was taken.
    pub fn read(&self, cell: &Arc<VersionedCell>) -> Result<Value> {
        if let Some(write) = self.pending.writes.get(&cell.id()) {
            return Ok(Arc::clone(&write.value));
        }
        cell.visible_as_of(self.snapshot)
            .map(|version| Arc::clone(version.value()))
            .ok_or(StmError::VersionNotFound {
                cell: cell.id(),
                snapshot: self.snapshot,
            })
    }

    /// Record a pending write, replacing any earlier one for the cell
    ///
    /// # Errors
    ///
    /// [`StmError::ConflictingOperation`] if the cell already has a pending
    /// commute.
    pub fn write(&mut self, cell: &Arc<VersionedCell>, value: Value) -> Result<Value> {
        let id = cell.id();
        if self.pending.commutes.contains_key(&id) {
            return Err(StmError::ConflictingOperation { cell: id });
        }
        self.pending.writes.insert(
            id,
            PendingWrite {
                cell: Arc::clone(cell),
                value: Arc::clone(&value),
            },
        );
        Ok(value)
    }

    /// Write a cell's current value back to it
    ///
    /// The value does not change, but the cell joins the write-set and is
    /// locked and validated at commit.
    pub fn touch(&mut self, cell: &Arc<VersionedCell>) -> Result<()> {
        let value = self.read(cell)?;
        self.write(cell, value)?;
        Ok(())
    }

    /// Register a commute function for the cell
    ///
    /// # Errors
    ///
    /// [`StmError::ConflictingOperation`] if the cell already has a pending
    /// write.
    pub fn commute(&mut self, cell: &Arc<VersionedCell>, f: Combinator) -> Result<()> {
        let id = cell.id();
        if self.pending.writes.contains_key(&id) {
            return Err(StmError::ConflictingOperation { cell: id });
        }
        self.pending
            .commutes
            .entry(id)
            .or_insert_with(|| PendingCommute::new(Arc::clone(cell)))
            .push(f);
        Ok(())
    }

    /// Hand the attempt's effects to the commit protocol
    ///
    /// Leaves the pending sets empty.
    pub(crate) fn take_attempt(&mut self) -> (PendingSet, Sequence, Arc<CommitRecord>) {
        (
            std::mem::take(&mut self.pending),
            self.snapshot,
            Arc::clone(&self.record),
        )
    }

    /// Prepare a retry: fresh snapshot, fresh record, empty pending sets
    pub(crate) fn restart(&mut self, clock: &LogicalClock) {
        *self = Self::begin(clock);
    }
}
