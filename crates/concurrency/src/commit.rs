//! The commit protocol
//!
//! ```text
//! 1. targets = write-set ∪ commute-set, in ascending CellId order
//! 2. for each target: lock (blocking); if it has a pending write and its
//!    latest committed sequence > snapshot -> Conflict (locks released)
//! 3. resolve commutes over the latest committed values
//! 4. publish every value under the attempt's Working commit record
//! 5. stamp the record under the clock lock (ATOMIC VISIBILITY POINT)
//! 6. release all locks
//! ```
//!
//! Every transaction acquires locks in the same global order, so two
//! committers can never wait on each other in a cycle. Resolution happens
//! before anything is published, so a failing commute leaves no trace in
//! any cell's history.

use crate::commute::PendingCommute;
use crate::observer::TransactionConfig;
use crate::version::{Value, VersionedCell};
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_stm_core::{CellId, CommitRecord, LogicalClock, Result, Sequence};

/// A pending direct write
#[derive(Debug)]
pub(crate) struct PendingWrite {
    pub(crate) cell: Arc<VersionedCell>,
    pub(crate) value: Value,
}

/// Everything an attempt intends to change
#[derive(Debug, Default)]
pub(crate) struct PendingSet {
    pub(crate) writes: BTreeMap<CellId, PendingWrite>,
    pub(crate) commutes: BTreeMap<CellId, PendingCommute>,
}

impl PendingSet {
    pub(crate) fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.commutes.is_empty()
    }
}

/// Result of running the protocol once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitOutcome {
    /// Nothing to write; no stamp was taken
    ReadOnly,
    /// All writes are visible at `sequence`
    Committed { sequence: Sequence, writes: usize },
    /// `cell` was committed at `committed`, after the attempt's snapshot
    Conflict { cell: CellId, committed: Sequence },
}

/// Run the commit protocol for one attempt
///
/// Locks are released and `pending` is consumed on every return path.
///
/// # Errors
///
/// Propagates commute resolution failures (`NeverSet`, `TypeMismatch`).
/// Nothing is published in that case.
pub(crate) fn commit(
    pending: PendingSet,
    snapshot: Sequence,
    record: &Arc<CommitRecord>,
    clock: &LogicalClock,
    config: &TransactionConfig,
) -> Result<CommitOutcome> {
    if pending.is_empty() {
        return Ok(CommitOutcome::ReadOnly);
    }
    let PendingSet { writes, commutes } = pending;

    let mut targets: BTreeMap<CellId, Arc<VersionedCell>> = BTreeMap::new();
    for (id, write) in &writes {
        targets.insert(*id, Arc::clone(&write.cell));
    }
    for (id, commute) in &commutes {
        targets.insert(*id, Arc::clone(&commute.cell));
    }

    // Lock in CellId order
    let mut guards = Vec::with_capacity(targets.len());
    for (id, cell) in &targets {
        let guard = cell.lock();
        if writes.contains_key(id) {
            if let Some(current) = cell.current_committed() {
                if current.sequence() > snapshot {
                    return Ok(CommitOutcome::Conflict {
                        cell: *id,
                        committed: current.sequence(),
                    });
                }
            }
        }
        guards.push(guard);
    }
    config.notify(|o| o.after_validation(snapshot, guards.len()));

    let mut values: BTreeMap<CellId, Value> = writes
        .into_iter()
        .map(|(id, write)| (id, write.value))
        .collect();
    for (id, commute) in commutes {
        values.insert(id, commute.resolve()?);
    }

    let count = values.len();
    for (guard, value) in guards.iter().zip(values.into_values()) {
        guard.publish(value, Arc::clone(record));
    }

    let sequence = clock.commit(record);
    drop(guards);

    Ok(CommitOutcome::Committed {
        sequence,
        writes: count,
    })
}
