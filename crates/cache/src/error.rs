//! Cache Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The underlying key-value store failed.
    #[display("store error")]
    Store,
    /// Checking whether an artifact exists failed (not "it doesn't exist").
    #[display("could not check artifact location: {_0}")]
    Locator(#[error(not(source))] String),
    /// A width that is not a finite, positive number at 2-decimal precision.
    #[display("invalid target width: {_0}")]
    InvalidWidth(#[error(not(source))] String),
    /// A store key that is not in `<identifier>--<width>` form.
    #[display("invalid cache key: {_0}")]
    InvalidKey(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store | Self::Locator(_))
    }
}
