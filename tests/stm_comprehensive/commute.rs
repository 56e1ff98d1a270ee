//! Commute Tests
//!
//! - Commutes fold in registration order over the value at commit time
//! - Concurrent commutes never lose an update
//! - A cell cannot be both set and commuted in one transaction

use crate::common::*;
use proptest::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;
use strata_stm::{atomically, Cell, Error, Stm};

#[test]
fn test_set_then_commute_is_rejected() {
    let cell = Cell::new(1i64);
    let err = atomically(|| {
        cell.set(2)?;
        cell.commute(|x| x + 1)
    })
    .unwrap_err();

    assert_eq!(err, Error::ConflictingOperation { cell: cell.id() });
    assert_eq!(cell.latest(), Some(1));
    assert_eq!(cell.history_len(), 1);
}

#[test]
fn test_commute_then_set_is_rejected() {
    let cell = Cell::new(1i64);
    let err = atomically(|| {
        cell.commute(|x| x + 1)?;
        cell.set(2).map(|_| ())
    })
    .unwrap_err();

    assert!(err.is_conflicting_operation());
    assert_eq!(cell.latest(), Some(1));
}

#[test]
fn test_touch_after_commute_is_rejected() {
    let cell = Cell::new(1i64);
    let err = atomically(|| {
        cell.commute(|x| x + 1)?;
        cell.touch()
    })
    .unwrap_err();
    assert!(err.is_conflicting_operation());
}

#[test]
fn test_write_and_commute_on_different_cells() {
    let a = Cell::new(1i64);
    let b = Cell::new(1i64);
    atomically(|| {
        a.set(5)?;
        b.commute(|x| x + 5)
    })
    .unwrap();
    assert_eq!(a.latest(), Some(5));
    assert_eq!(b.latest(), Some(6));
}

#[test]
fn test_commute_applies_in_registration_order() {
    let cell = Cell::new(5i64);
    atomically(|| {
        cell.commute(|x| x * 2)?;
        cell.commute(|x| x + 3)
    })
    .unwrap();
    // f2(f1(5)), not f1(f2(5)) = 16
    assert_eq!(cell.latest(), Some(13));
}

/// The base is the latest committed value at commit time
#[test]
fn test_commute_base_is_read_at_commit() {
    let cell = Cell::new(5i64);
    let barrier = Arc::new(Barrier::new(2));
    let attempts = Arc::new(Attempts::new());

    let t1 = {
        let cell = cell.clone();
        let barrier = Arc::clone(&barrier);
        let attempts = Arc::clone(&attempts);
        thread::spawn(move || {
            atomically(|| {
                attempts.begin();
                cell.commute(|x| x * 2)?;
                barrier.wait(); // commute registered
                barrier.wait(); // competing write committed
                cell.commute(|x| x + 3)
            })
        })
    };

    barrier.wait();
    atomically(|| cell.set(100)).unwrap();
    barrier.wait();

    t1.join().unwrap().unwrap();
    assert_eq!(cell.latest(), Some(203));
    assert_eq!(attempts.count(), 1);
}

/// Two concurrent increments of 10 give 12, never 11
#[test]
fn test_concurrent_commutes_do_not_lose_updates() {
    init_tracing();
    let stm = Arc::new(Stm::new());
    let y = Cell::new(10i64);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let stm = Arc::clone(&stm);
            let y = y.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut first = true;
                stm.run(|| {
                    y.commute(|x| x + 1)?;
                    if std::mem::take(&mut first) {
                        // Both commutes are registered before either commits
                        barrier.wait();
                    }
                    Ok::<_, Error>(())
                })
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap().unwrap();
    }
    assert_eq!(y.latest(), Some(12));
    assert_eq!(stm.metrics().conflicts, 0);
    assert_eq!(stm.metrics().commits, 2);
}

#[test]
fn test_many_commuters() {
    const THREADS: usize = 8;
    const INCREMENTS: u64 = 200;

    let stm = Arc::new(Stm::new());
    let counter = Cell::new(1_000u64);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let stm = Arc::clone(&stm);
            let counter = counter.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..INCREMENTS {
                    stm.run(|| counter.commute(|n| n + 1)).unwrap();
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(counter.latest(), Some(1_000 + THREADS as u64 * INCREMENTS));
    assert_eq!(stm.metrics().conflicts, 0);
}

#[test]
fn test_commute_on_empty_cell_is_never_set() {
    let cell: Cell<u64> = Cell::empty();
    let err = atomically(|| cell.commute(|n| n + 1)).unwrap_err();

    assert_eq!(err, Error::NeverSet { cell: cell.id() });
    assert_eq!(cell.history_len(), 0);
}

#[test]
fn test_never_set_rolls_back_other_writes() {
    let written = Cell::new(1u64);
    let empty: Cell<u64> = Cell::empty();
    let err = atomically(|| {
        written.set(2)?;
        empty.commute(|n| n + 1)
    })
    .unwrap_err();

    assert!(matches!(err, Error::NeverSet { .. }));
    assert_eq!(written.latest(), Some(1));
    // Locks were released
    atomically(|| written.set(3)).unwrap();
    assert_eq!(written.latest(), Some(3));
}

/// Commute on a cell whose first value was set by an earlier transaction
#[test]
fn test_commute_after_first_transactional_set() {
    let cell: Cell<u64> = Cell::empty();
    atomically(|| cell.set(40)).unwrap();
    atomically(|| cell.commute(|n| n + 2)).unwrap();
    assert_eq!(cell.latest(), Some(42));
}

fn apply(kind: u8, operand: i64, x: i64) -> i64 {
    match kind {
        0 => x.wrapping_add(operand),
        1 => x.wrapping_mul(operand),
        _ => x.wrapping_sub(operand),
    }
}

proptest! {
    #[test]
    fn prop_commutes_fold_in_registration_order(
        base in -1_000i64..1_000,
        ops in proptest::collection::vec((0u8..3, -20i64..20), 0..16),
    ) {
        let cell = Cell::new(base);
        atomically(|| {
            for &(kind, operand) in &ops {
                cell.commute(move |x| apply(kind, operand, x))?;
            }
            Ok(())
        })
        .unwrap();

        let expected = ops
            .iter()
            .fold(base, |acc, &(kind, operand)| apply(kind, operand, acc));
        prop_assert_eq!(cell.latest(), Some(expected));
    }
}
