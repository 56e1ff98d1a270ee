//! Error types for the STM engine
//!
//! Every failure a transaction body can observe is a variant of
//! [`StmError`]. Validation conflicts are not part of this enum: they are
//! absorbed by the retry loop and never reach the caller.

use crate::types::{CellId, Sequence};
use thiserror::Error;

/// Errors surfaced by cell operations and transactional runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StmError {
    /// The cell had no committed value as of the reader's snapshot
    #[error("version not found: {cell} has no value committed at or before sequence {snapshot}")]
    VersionNotFound {
        /// Cell that was read
        cell: CellId,
        /// Snapshot of the reading transaction
        snapshot: Sequence,
    },

    /// A cell received both a direct write and a commute in one attempt
    #[error("conflicting operation: {cell} cannot be both set and commuted in the same transaction")]
    ConflictingOperation {
        /// Cell that received both kinds of update
        cell: CellId,
    },

    /// Commit-time commute resolution found no committed base value
    #[error("never set: {cell} has no committed value to commute over")]
    NeverSet {
        /// Cell that was commuted
        cell: CellId,
    },

    /// A cell operation ran on a thread with no active transaction
    #[error("no transaction is running on this thread")]
    NoTransaction,

    /// A stored value did not have the cell's declared type
    #[error("internal error: value stored in {cell} has an unexpected type")]
    TypeMismatch {
        /// Cell holding the value
        cell: CellId,
    },
}

/// Result type for STM operations
pub type Result<T> = std::result::Result<T, StmError>;

impl StmError {
    /// Check if this error signals misuse of the API by the caller
    ///
    /// Usage errors are never retried; the transaction body is expected to
    /// be fixed instead.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            StmError::VersionNotFound { .. }
                | StmError::ConflictingOperation { .. }
                | StmError::NeverSet { .. }
                | StmError::NoTransaction
        )
    }

    /// Check if this is a version-not-found error
    pub fn is_version_not_found(&self) -> bool {
        matches!(self, StmError::VersionNotFound { .. })
    }

    /// Check if this is a conflicting-operation error
    pub fn is_conflicting_operation(&self) -> bool {
        matches!(self, StmError::ConflictingOperation { .. })
    }

    /// Check if this is an internal invariant violation
    pub fn is_serious(&self) -> bool {
        matches!(self, StmError::TypeMismatch { .. })
    }

    /// Cell the error refers to, if any
    pub fn cell(&self) -> Option<CellId> {
        match self {
            StmError::VersionNotFound { cell, .. }
            | StmError::ConflictingOperation { cell }
            | StmError::NeverSet { cell }
            | StmError::TypeMismatch { cell } => Some(*cell),
            StmError::NoTransaction => None,
        }
    }
}
