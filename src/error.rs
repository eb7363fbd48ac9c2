//! Application Error Types

use derive_more::{Display, Error};

/// An application error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not open database")]
    Database,
    #[display("could not set up artifact generator")]
    Generator,
    #[display("invalid target width")]
    Width,
    #[display("{_0}")]
    Failed(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database)
    }
}
