//! Convenient imports for strata-stm.
//!
//! ```ignore
//! use strata_stm::prelude::*;
//!
//! let counter = Cell::new(0u64);
//! atomically(|| counter.commute(|n| n + 1))?;
//! ```

// Entry points
pub use crate::stm::{atomically, Stm, StmBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Cells
pub use strata_stm_concurrency::Cell;

// Hooks
pub use strata_stm_concurrency::CommitObserver;
