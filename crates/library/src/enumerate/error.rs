//! Error types for the [`enumerate`](super) module.

use derive_more::{Display, Error};

/// An enumeration error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for enumeration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of an enumeration failure.
///
/// A denied permission is not an error; it is reported as an event.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Checking or requesting the index permission failed.
    Permission,
    /// A page (or the total count) could not be read from the index.
    Index,
    /// The enumeration state could not be persisted.
    Store,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Index | Self::Store)
    }
}
