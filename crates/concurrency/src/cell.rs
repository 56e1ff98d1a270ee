//! Typed transactional cells
//!
//! [`Cell<T>`] is a cheap, cloneable handle to a [`VersionedCell`]. Its
//! transactional operations act on the calling thread's active transaction
//! and fail with [`StmError::NoTransaction`] outside one.
//!
//! # Example
//!
//! ```ignore
//! use strata_stm_concurrency::{run_transaction, Cell, TransactionConfig};
//!
//! let from = Cell::new(100i64);
//! let to = Cell::new(0i64);
//!
//! run_transaction(&TransactionConfig::new(), || {
//!     from.set(from.get()? - 10)?;
//!     to.commute(|x| x + 10)
//! })?;
//! ```

use crate::commute::combinator;
use crate::context::with_transaction;
use crate::version::{Value, VersionedCell};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use strata_stm_core::{CellId, LogicalClock, Result, StmError};

/// A shared, transactional reference to a value of type `T`
pub struct Cell<T> {
    inner: Arc<VersionedCell>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Cell<T>
where
    T: Any + Send + Sync + Clone,
{
    /// Create a cell holding `value`
    ///
    /// Outside a transaction the value is committed immediately. Inside one
    /// it becomes a pending write of the current attempt, as with
    /// [`new_in_transaction`](Self::new_in_transaction), and is visible to
    /// other threads only once that attempt commits.
    pub fn new(value: T) -> Self {
        let value: Value = Arc::new(value);
        let inner = Arc::new(VersionedCell::new());
        if with_transaction(|tx| tx.write(&inner, Arc::clone(&value))).is_err() {
            // No active transaction
            inner.commit_standalone(value, LogicalClock::global());
        }
        Self::from_versioned(inner)
    }

    /// Create a cell with no value
    ///
    /// Reads fail with `VersionNotFound` until a transaction commits a
    /// first write.
    pub fn empty() -> Self {
        Self::from_versioned(Arc::new(VersionedCell::new()))
    }

    /// Create an empty cell and write `value` to it in the current transaction
    ///
    /// The value becomes visible when the transaction commits.
    pub fn new_in_transaction(value: T) -> Result<Self> {
        let cell = Self::empty();
        cell.set(value)?;
        Ok(cell)
    }

    fn from_versioned(inner: Arc<VersionedCell>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Creation-order identity
    pub fn id(&self) -> CellId {
        self.inner.id()
    }

    /// Read the value in the current transaction
    pub fn get(&self) -> Result<T> {
        let value = with_transaction(|tx| tx.read(&self.inner))?;
        downcast(&value, self.id())
    }

    /// Write the value in the current transaction
    pub fn set(&self, value: T) -> Result<T> {
        let erased: Value = Arc::new(value.clone());
        with_transaction(|tx| tx.write(&self.inner, erased))?;
        Ok(value)
    }

    /// Force the cell into the write-set without changing its value
    pub fn touch(&self) -> Result<()> {
        with_transaction(|tx| tx.touch(&self.inner))
    }

    /// Register `f` to run over the cell's latest value at commit time
    pub fn commute<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(T) -> T + 'static,
    {
        let f = combinator(self.id(), f);
        with_transaction(|tx| tx.commute(&self.inner, f))
    }

    /// Latest committed value, read outside any transaction
    pub fn latest(&self) -> Option<T> {
        self.inner
            .current_committed()
            .and_then(|version| version.value().as_ref().downcast_ref::<T>().cloned())
    }

    /// Number of versions ever published to this cell
    pub fn history_len(&self) -> usize {
        self.inner.history_len()
    }

    /// The underlying versioned cell
    pub fn versioned(&self) -> &Arc<VersionedCell> {
        &self.inner
    }
}

fn downcast<T: Any + Clone>(value: &Value, cell: CellId) -> Result<T> {
    value
        .as_ref()
        .downcast_ref::<T>()
        .cloned()
        .ok_or(StmError::TypeMismatch { cell })
}

impl<T> Clone for Cell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Cell<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Eq for Cell<T> {}

impl<T> fmt::Debug for Cell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cell").field(&self.inner.id()).finish()
    }
}
