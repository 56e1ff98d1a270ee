//! Nesting and Error Propagation Tests
//!
//! - A run inside a run joins the outer transaction
//! - Body errors propagate unchanged and discard pending effects

use crate::common::*;
use strata_stm::{atomically, current_snapshot, in_transaction, Cell, Error, Stm};

#[derive(Debug, PartialEq)]
enum TransferError {
    Stm(Error),
    Insufficient { available: i64 },
}

impl From<Error> for TransferError {
    fn from(e: Error) -> Self {
        TransferError::Stm(e)
    }
}

fn withdraw(account: &Cell<i64>, amount: i64) -> Result<i64, TransferError> {
    Stm::global().run(|| {
        let available = account.get()?;
        if available < amount {
            return Err(TransferError::Insufficient { available });
        }
        Ok(account.set(available - amount)?)
    })
}

#[test]
fn test_nested_run_joins_outer_transaction() {
    let a = Cell::new(1u64);
    let b = Cell::new(1u64);

    let (outer_snapshot, inner_snapshot) = atomically(|| {
        a.set(10)?;
        let outer_snapshot = current_snapshot();
        let inner_snapshot = atomically(|| {
            // Pending write from the outer body is visible
            assert_eq!(a.get()?, 10);
            b.set(20)?;
            Ok(current_snapshot())
        })?;
        assert_eq!(b.get()?, 20);
        Ok((outer_snapshot, inner_snapshot))
    })
    .unwrap();

    assert_eq!(outer_snapshot, inner_snapshot);
    assert_eq!(a.latest(), Some(10));
    assert_eq!(b.latest(), Some(20));
    let seq_a = a.versioned().current_committed().unwrap().sequence();
    let seq_b = b.versioned().current_committed().unwrap().sequence();
    assert_eq!(seq_a, seq_b);
}

#[test]
fn test_nested_error_aborts_outer() {
    let a = Cell::new(1u64);
    let empty: Cell<u64> = Cell::empty();

    let err = atomically(|| {
        a.set(2)?;
        atomically(|| empty.get())
    })
    .unwrap_err();

    assert!(err.is_version_not_found());
    assert_eq!(a.latest(), Some(1));
}

#[test]
fn test_custom_error_propagates() {
    let account = Cell::new(30i64);

    assert_eq!(withdraw(&account, 10), Ok(20));
    assert_eq!(
        withdraw(&account, 50),
        Err(TransferError::Insufficient { available: 20 })
    );
    assert_eq!(account.latest(), Some(20));
}

#[test]
fn test_custom_error_discards_pending_writes() {
    let log = Cell::new(Vec::<String>::new());
    let account = Cell::new(5i64);

    let result: Result<(), TransferError> = Stm::global().run(|| {
        let mut entries = log.get()?;
        entries.push(String::from("attempted"));
        log.set(entries)?;
        withdraw(&account, 100)?;
        Ok(())
    });

    assert_eq!(
        result,
        Err(TransferError::Insufficient { available: 5 })
    );
    assert_eq!(log.latest(), Some(Vec::new()));
    assert_eq!(log.history_len(), 1);
}

#[test]
fn test_stm_error_wrapped_in_custom_error() {
    let empty: Cell<i64> = Cell::empty();
    match withdraw(&empty, 1) {
        Err(TransferError::Stm(e)) => {
            assert!(e.is_version_not_found());
            assert_eq!(e.cell(), Some(empty.id()));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[test]
fn test_in_transaction_flag() {
    assert!(!in_transaction());
    assert_eq!(current_snapshot(), None);

    let inside = atomically(|| Ok(in_transaction())).unwrap();
    assert!(inside);
    assert!(!in_transaction());
}

#[test]
fn test_cell_created_in_failed_transaction_stays_empty() {
    let mut created = None;
    let result = atomically(|| {
        let cell = Cell::new_in_transaction(1u64)?;
        created = Some(cell.clone());
        Err::<(), _>(Error::NoTransaction)
    });

    assert!(result.is_err());
    let cell = created.unwrap();
    assert_eq!(cell.latest(), None);
    assert_eq!(cell.history_len(), 0);
}

/// A cell constructed inside a body is a pending write of that attempt
#[test]
fn test_cell_constructed_in_body_commits_once() {
    let stm = Stm::new();
    let attempts = Attempts::new();

    let cell = stm
        .run(|| {
            attempts.begin();
            let cell = Cell::new(1u64);
            cell.set(cell.get()? + 1)?;
            Ok::<_, Error>(cell)
        })
        .unwrap();

    assert_eq!(attempts.count(), 1);
    assert_eq!(cell.latest(), Some(2));
    assert_eq!(cell.history_len(), 1);
    let metrics = stm.metrics();
    assert_eq!(metrics.commits, 1);
    assert_eq!(metrics.conflicts, 0);
}

#[test]
fn test_cell_constructed_in_failed_body_stays_empty() {
    let mut created = None;
    let result = atomically(|| {
        created = Some(Cell::new(5u64));
        Err::<(), _>(Error::NoTransaction)
    });

    assert!(result.is_err());
    let cell = created.unwrap();
    assert_eq!(cell.latest(), None);
    assert_eq!(cell.history_len(), 0);
}
