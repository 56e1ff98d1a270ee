//! Error types for strata-stm.
//!
//! Every failure a transaction body can observe is an [`Error`]. Validation
//! conflicts never appear here: they restart the body instead.
//!
//! Bodies may use their own error type as long as it implements
//! `From<Error>`, so cell operations compose with `?`.

pub use strata_stm_core::error::{Result, StmError as Error};
