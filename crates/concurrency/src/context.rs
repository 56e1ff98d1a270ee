//! Per-thread transaction context and the retry loop
//!
//! Each thread has a slot holding at most one active [`Transaction`]. The
//! outermost [`run_transaction`] installs a transaction, drives the body and
//! the commit protocol until an attempt commits, and clears the slot on
//! every exit, including panics. A `run_transaction` call made while a
//! transaction is already active runs the body directly against it: nested
//! runs flatten into the outer attempt.
//!
//! ## Attempt State Machine
//!
//! ```text
//! RUNNING --body ok--> VALIDATING --ok--> COMMITTED
//!    ^                     |
//!    +------- RETRY <------+  (conflict: fresh snapshot, empty pending sets)
//! ```
//!
//! Every attempt, including the first, reads at its own fresh snapshot.
//! Retries are unbounded and immediate. The transaction leaves the slot
//! while its attempt validates and commits, and is reinstalled for a retry.
//!
//! ## Purity Requirement
//!
//! The body may run many times. It must not perform effects other than
//! cell operations, or those effects will be repeated.

use crate::commit::{commit, CommitOutcome};
use crate::observer::TransactionConfig;
use crate::transaction::Transaction;
use std::cell::RefCell;
use strata_stm_core::{LogicalClock, Result, Sequence, StmError};
use tracing::{debug, trace};

thread_local! {
    static CURRENT: RefCell<Option<Transaction>> = const { RefCell::new(None) };
}

/// Check if the calling thread has an active transaction
pub fn in_transaction() -> bool {
    CURRENT.with(|slot| slot.borrow().is_some())
}

/// Snapshot of the calling thread's active transaction, if any
pub fn current_snapshot() -> Option<Sequence> {
    CURRENT.with(|slot| slot.borrow().as_ref().map(Transaction::snapshot))
}

/// Run `f` against the calling thread's active transaction
///
/// # Errors
///
/// [`StmError::NoTransaction`] if no transaction is active.
pub(crate) fn with_transaction<R>(f: impl FnOnce(&mut Transaction) -> Result<R>) -> Result<R> {
    CURRENT.with(|slot| match slot.borrow_mut().as_mut() {
        Some(tx) => f(tx),
        None => Err(StmError::NoTransaction),
    })
}

fn install(tx: Transaction) {
    CURRENT.with(|slot| *slot.borrow_mut() = Some(tx));
}

/// Take the active transaction out of the slot
fn uninstall() -> Result<Transaction> {
    CURRENT
        .with(|slot| slot.borrow_mut().take())
        .ok_or(StmError::NoTransaction)
}

/// Clears the slot when the outermost run exits
struct Installed;

impl Installed {
    fn new(tx: Transaction) -> Self {
        install(tx);
        Installed
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        let _ = CURRENT.try_with(|slot| slot.borrow_mut().take());
    }
}

/// Run `body` as a transaction on the calling thread
///
/// Retries the body until its attempt commits. Returns the body's result
/// from the committing attempt.
///
/// # Errors
///
/// Propagates any error the body returns, and `NeverSet` or `TypeMismatch`
/// from commute resolution. Pending effects are discarded and all locks are
/// released before the error is returned. Validation conflicts are never
/// returned; they restart the body.
pub fn run_transaction<R, E, F>(config: &TransactionConfig, mut body: F) -> std::result::Result<R, E>
where
    F: FnMut() -> std::result::Result<R, E>,
    E: From<StmError>,
{
    if in_transaction() {
        return body();
    }

    let clock = LogicalClock::global();
    let _installed = Installed::new(Transaction::begin(clock));

    loop {
        let outcome = body();
        // The commit phase runs with the slot empty, so cell operations made
        // from observers fail with NoTransaction
        let mut tx = uninstall()?;
        let value = outcome?;
        let (pending, snapshot, record) = tx.take_attempt();

        config.notify(|o| o.after_body(snapshot));

        match commit(pending, snapshot, &record, clock, config)? {
            CommitOutcome::ReadOnly => {
                config.notify(|o| o.on_read_only(snapshot));
                return Ok(value);
            }
            CommitOutcome::Committed { sequence, writes } => {
                trace!("Committed {} cells at sequence {}", writes, sequence);
                config.notify(|o| o.on_commit(sequence, writes));
                return Ok(value);
            }
            CommitOutcome::Conflict { cell, committed } => {
                debug!(
                    "Conflict on {}: committed at {} after snapshot {}, retrying",
                    cell, committed, snapshot
                );
                config.notify(|o| o.on_conflict(cell, committed, snapshot));
                tx.restart(clock);
                install(tx);
            }
        }
    }
}
