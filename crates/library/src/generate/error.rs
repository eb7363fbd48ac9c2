//! Error types for [`ArtifactGenerator`](super::ArtifactGenerator) implementations.

use derive_more::{Display, Error};

/// A generation error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for generation operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No usable transcoder is available.
    #[display("no transcoder available: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// The source asset could not be read.
    #[display("could not read source asset: {_0}")]
    Source(#[error(not(source))] String),
    /// The transcoder ran but did not produce an artifact.
    #[display("transcoder failed: {_0}")]
    Failed(#[error(not(source))] String),
    /// Writing the artifact failed.
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}
