//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Each operation module has its own
//! error type describing *where* it failed; these kinds describe *which*
//! operation failed.

use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not restore persisted state")]
    Restore,
    #[display("media index enumeration failed")]
    Enumerate,
    #[display("artifact reconciliation failed")]
    Reconcile,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Restore => false,
            Self::Enumerate | Self::Reconcile => true,
        }
    }
}
