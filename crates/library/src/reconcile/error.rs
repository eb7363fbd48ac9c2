//! Error types for the [`reconcile`](super) module.

use derive_more::{Display, Error};

/// A reconciliation error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a reconciliation failure.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A lookup, write or clear via [`mipmap_cache::ArtifactCache`] failed.
    Cache,
    /// The generator could not produce the artifact for this asset.
    #[display("could not generate artifact for {_0}")]
    Generation(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cache => true,
            Self::Generation(_) => false,
        }
    }
}
