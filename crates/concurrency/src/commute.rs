//! Commutative updates
//!
//! A commute records a function over a cell's value instead of the value
//! itself. The functions are folded at commit time, with every target cell
//! locked, over the cell's *latest* committed value rather than the value
//! seen at the transaction's snapshot. Two transactions incrementing the
//! same counter therefore never conflict, and neither increment is lost.

use crate::version::{Value, VersionedCell};
use smallvec::SmallVec;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use strata_stm_core::{CellId, Result, StmError};
use tracing::warn;

/// A type-erased commute function
pub type Combinator = Box<dyn FnOnce(Value) -> Result<Value>>;

/// Wrap a typed update as a [`Combinator`] for `cell`
pub fn combinator<T, F>(cell: CellId, f: F) -> Combinator
where
    T: Any + Send + Sync + Clone,
    F: FnOnce(T) -> T + 'static,
{
    Box::new(move |current: Value| {
        let value = current
            .as_ref()
            .downcast_ref::<T>()
            .cloned()
            .ok_or(StmError::TypeMismatch { cell })?;
        Ok(Arc::new(f(value)) as Value)
    })
}

/// Commute functions pending for one cell, in registration order
pub(crate) struct PendingCommute {
    pub(crate) cell: Arc<VersionedCell>,
    combinators: SmallVec<[Combinator; 2]>,
}

impl PendingCommute {
    pub(crate) fn new(cell: Arc<VersionedCell>) -> Self {
        Self {
            cell,
            combinators: SmallVec::new(),
        }
    }

    pub(crate) fn push(&mut self, f: Combinator) {
        self.combinators.push(f);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.combinators.len()
    }

    /// Fold the pending functions over the latest committed value
    ///
    /// Must only be called while the cell's commit lock is held.
    pub(crate) fn resolve(self) -> Result<Value> {
        let id = self.cell.id();
        let base = match self.cell.current_committed() {
            Some(version) => Arc::clone(version.value()),
            None => {
                warn!("Commute on {} has no committed base value", id);
                return Err(StmError::NeverSet { cell: id });
            }
        };
        self.combinators
            .into_iter()
            .try_fold(base, |value, f| f(value))
    }
}

impl fmt::Debug for PendingCommute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommute")
            .field("cell", &self.cell.id())
            .field("combinators", &self.combinators.len())
            .finish()
    }
}
