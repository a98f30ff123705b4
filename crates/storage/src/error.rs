//! Storage Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use sqlblob_compress::error::{Error as CompressionError, ErrorKind as CompressionErrorKind};
use std::io::Error as IoError;

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Access denied (permissions or credentials)
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// Network-related error (S3 connections, etc.)
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// Object key is empty, contains invalid characters or escapes the root
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
    /// The sink completed but reported that it did not keep the snapshot.
    #[display("snapshot rejected by sink")]
    Rejected,
    /// Compression/decompression of the snapshot envelope failed
    #[display("compression error: {_0}")]
    Compression(CompressionErrorKind),
    /// The stored object was read but is not a usable snapshot. Fetching
    /// again returns the same bytes.
    #[display("stored snapshot is corrupt")]
    Corrupt,
    /// Failure injected by a test double.
    #[display("injected failure: {_0}")]
    Injected(#[error(not(source))] &'static str),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}
impl ErrorKind {
    /// Convert a compression error into a storage error, preserving the
    /// compress crate's `Exn` frame as a child in this error tree.
    #[track_caller]
    pub fn compression(err: CompressionError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Compression(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Network(_) | Self::BackendError(_) | Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Network("timeout".to_string()).is_retryable());
        assert!(ErrorKind::Rejected.is_retryable());
        assert!(!ErrorKind::InvalidKey("../x".to_string()).is_retryable());
        assert!(!ErrorKind::PermissionDenied("db.sqlite".to_string()).is_retryable());
        assert!(!ErrorKind::Corrupt.is_retryable());
    }

    #[test]
    fn test_compression_error_keeps_kind() {
        let err = "lz4".parse::<sqlblob_compress::Compression>().unwrap_err();
        let err = ErrorKind::compression(err);
        assert!(matches!(&*err, ErrorKind::Compression(CompressionErrorKind::UnsupportedFormat(_))));
    }
}
