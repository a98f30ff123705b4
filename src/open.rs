//! Building the backend stack and handle described by a [`Config`].

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlblob_config::{Backend, Config};
use sqlblob_handle::CachedHandle;
use sqlblob_storage::BlobHandle;
use sqlblob_storage::backend::{CompressedBlob, LocalBlob, MemoryBlob, ReadOnlyBlob};
use std::sync::Arc;

pub async fn handle(config: &Config) -> Result<CachedHandle> {
    let blob = blob(config)?;
    tracing::info!(backend = blob.name(), read_only = config.read_only, "Opening snapshot");
    Ok(CachedHandle::from_blob(blob, config.handle.options.clone()).await)
}

/// The configured backend, always wrapped for compression (reads detect the
/// format, so this is harmless with `compression = "none"`) and optionally
/// made read-only.
pub fn blob(config: &Config) -> Result<BlobHandle> {
    let kind = config.backend.kind();
    let mut blob: BlobHandle = match &config.backend {
        Backend::Memory => Arc::new(MemoryBlob::default()),
        Backend::Local { root, key } => Arc::new(LocalBlob::new(kind, root, key).or_raise(|| ErrorKind::Backend(kind))?),
        #[cfg(feature = "s3")]
        Backend::S3 { bucket, key, region, endpoint, key_id, key_secret } => Arc::new(
            sqlblob_storage::backend::S3Blob::new(kind, bucket, key, region, endpoint.clone(), key_id, key_secret)
                .or_raise(|| ErrorKind::Backend(kind))?,
        ),
        #[cfg(not(feature = "s3"))]
        Backend::S3 { .. } => exn::bail!(ErrorKind::Disabled(kind)),
    };
    blob = Arc::new(CompressedBlob::new(blob, config.compression));
    if config.read_only {
        blob = Arc::new(ReadOnlyBlob::new(blob));
    }
    Ok(blob)
}
