//! Collaborator traits and their backend implementations.
//!
//! A cached handle talks to remote storage through three narrow traits so
//! that each capability can be supplied (or, for the oracle, omitted)
//! independently. Every backend in this module implements all three for a
//! single snapshot object, which is what [`Blob`] expresses.

mod compressed;
mod local;
#[cfg(feature = "mock")]
mod memory;
mod ro;
#[cfg(feature = "s3")]
mod s3;

pub use self::compressed::CompressedBlob;
pub use self::local::LocalBlob;
#[cfg(feature = "mock")]
pub use self::memory::MemoryBlob;
pub use self::ro::ReadOnlyBlob;
#[cfg(feature = "s3")]
pub use self::s3::S3Blob;
use crate::VersionTag;
use crate::error::Result;
use async_trait::async_trait;

/// Fetches the current serialized snapshot.
///
/// `Ok(None)` means there is no snapshot yet; callers treat an `Err` the
/// same way, so implementations only need to distinguish the two for
/// logging.
#[async_trait]
pub trait BlobSource: Send + Sync {
    async fn fetch(&self) -> Result<Option<Vec<u8>>>;
}

/// Persists a serialized snapshot, replacing whatever was there.
#[async_trait]
pub trait BlobSink: Send + Sync {
    async fn store(&self, bytes: &[u8]) -> Result<()>;
}

/// Reports a cheap marker for the current remote snapshot.
///
/// Must be cheaper than [`BlobSource::fetch`] to be worth having. `Ok(None)`
/// means the state is unknown (missing object, no ETag, ...), which the
/// caller treats as "possibly changed".
#[async_trait]
pub trait VersionOracle: Send + Sync {
    async fn version(&self) -> Result<Option<VersionTag>>;
}

/// A single snapshot object that can be read, written and versioned.
///
/// # Examples
///
/// ```no_run
/// use sqlblob_storage::{Blob, error::Result};
///
/// async fn copy(from: &dyn Blob, to: &dyn Blob) -> Result<bool> {
///     match from.fetch().await? {
///         Some(bytes) => {
///             to.store(&bytes).await?;
///             Ok(true)
///         },
///         None => Ok(false),
///     }
/// }
/// ```
pub trait Blob: BlobSource + BlobSink + VersionOracle {
    /// Name of the configured backend, used for logging only.
    fn name(&self) -> &str;
}
