//! Identity and ordering types
//!
//! This module defines:
//! - [`Sequence`]: a stamp handed out by the [`LogicalClock`](crate::LogicalClock)
//! - [`CellId`]: the creation-order identity of a versioned cell

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A logical timestamp issued by the commit clock.
///
/// Used both as a transaction's read snapshot and as the commit stamp of
/// its writes. Stamps are strictly increasing and never reused.
pub type Sequence = u64;

/// Creation-order identity of a versioned cell
///
/// Every cell gets the next id at construction. Commit locks are always
/// acquired in ascending `CellId` order, so the ordering must be total and
/// identical for every transaction in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(u64);

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

impl CellId {
    /// Allocate the next cell id
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_stm_core::CellId;
    ///
    /// let a = CellId::next();
    /// let b = CellId::next();
    /// assert!(a < b);
    /// ```
    pub fn next() -> Self {
        CellId(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}
