//! Compressing snapshot backend.

use async_trait::async_trait;
use exn::ResultExt;
use sqlblob_compress::Compression;

use crate::error::{ErrorKind, Result};
use crate::{Blob, BlobHandle, BlobSink, BlobSource, VersionOracle, VersionTag};

/// Wraps another backend and compresses snapshots on their way out.
///
/// Fetched snapshots are decompressed according to their magic bytes rather
/// than the configured format, so switching formats (or turning compression
/// off) never strands an older snapshot. An envelope that does not
/// decompress is reported as [`ErrorKind::Corrupt`].
#[derive(Clone)]
pub struct CompressedBlob {
    inner: BlobHandle,
    format: Compression,
}
impl CompressedBlob {
    pub fn new(inner: BlobHandle, format: Compression) -> Self {
        Self { inner, format }
    }
}

#[async_trait]
impl BlobSource for CompressedBlob {
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        match self.inner.fetch().await? {
            Some(bytes) => Ok(Some(sqlblob_compress::unseal(&bytes).or_raise(|| ErrorKind::Corrupt)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BlobSink for CompressedBlob {
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        let sealed = sqlblob_compress::seal(self.format, bytes).map_err(ErrorKind::compression)?;
        tracing::debug!(format = %self.format, raw = bytes.len(), sealed = sealed.len(), "Sealed snapshot");
        self.inner.store(&sealed).await
    }
}

#[async_trait]
impl VersionOracle for CompressedBlob {
    async fn version(&self) -> Result<Option<VersionTag>> {
        self.inner.version().await
    }
}

impl Blob for CompressedBlob {
    fn name(&self) -> &str {
        self.inner.name()
    }
}
