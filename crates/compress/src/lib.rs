//! Compression envelope for database snapshots.
//!
//! Snapshots are stored as raw SQLite images by default. When a backend is
//! configured with a [`Compression`] format, the image is wrapped before it
//! is uploaded and unwrapped after it is downloaded. Unwrapping never needs
//! to be told which format was used: it is detected from magic bytes, so a
//! bucket can hold snapshots written with different settings over time.
//!
//! - **Format detection** from magic bytes ([`Compression::from_magic_bytes`])
//!   or a configuration string ([`FromStr`](std::str::FromStr))
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`])
//! - **Envelope helpers** that pair the two ([`seal`], [`unseal`])
//!
//! Bzip2 and Gzip are always available. Zstd is behind the `zstd` feature.

mod construct;
pub mod error;
mod ops;

pub use crate::ops::{seal, unseal};

/// Every SQLite database image starts with this 16 byte header.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (raw SQLite image).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression
    Bzip2,
    /// Gzip compression
    Gzip,
    /// Zstd compression
    #[cfg(feature = "zstd")]
    Zstd,
}
