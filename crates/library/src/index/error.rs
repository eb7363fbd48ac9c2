//! Error types for [`MediaIndex`](super::MediaIndex) implementations.

use derive_more::{Display, Error};

/// A media index error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for media index operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The index could not be read (I/O failure, device unavailable).
    #[display("media index unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// A page was requested with a cursor the index did not hand out.
    #[display("invalid page cursor: {_0}")]
    InvalidCursor(#[error(not(source))] String),
    /// Reading the index requires a permission that has not been granted.
    #[display("permission to read the media index has not been granted")]
    PermissionDenied,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
