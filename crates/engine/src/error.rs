//! Engine Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not open in-memory database")]
    Open,
    /// The snapshot bytes are not a SQLite image. Retrying with the same
    /// bytes will fail the same way.
    #[display("corrupt snapshot")]
    CorruptSnapshot,
    #[display("could not serialize database")]
    Serialize,
    #[display("statement failed: {_0}")]
    Statement(#[error(not(source))] String),
    #[display("invalid parameters: {_0}")]
    Parameters(#[error(not(source))] String),
    #[display("could not close database")]
    Close,
    /// SQLite could not allocate a buffer for the snapshot image.
    #[display("out of memory while loading snapshot")]
    Allocation,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Allocation)
    }
}
