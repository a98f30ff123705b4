//! Handle Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A handle error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The fetched snapshot could not be loaded. The handle stays without a
    /// database until the remote version changes.
    #[display("remote snapshot is corrupt")]
    CorruptSnapshot,
    /// A fresh database could not be created for reasons other than the
    /// snapshot content.
    #[display("could not load snapshot into a fresh database")]
    Reload,
    /// No database is loaded, because the last reload failed.
    #[display("no database loaded; waiting for a new remote version")]
    MissingDatabase,
    /// The statement failed inside the engine.
    #[display("statement `{statement}` failed: {message}")]
    Execution {
        #[error(not(source))]
        statement: String,
        #[error(not(source))]
        message: String,
    },
    #[display("could not close database")]
    Close,
    /// The statement ran locally but its snapshot was not written back.
    /// Local state is ahead of the remote copy.
    #[display("statement succeeded locally but the snapshot was not persisted")]
    Persistence,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Reload | Self::Persistence)
    }
}
