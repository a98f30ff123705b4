//! Read-only snapshot backend.
//!
//! Wraps another backend and prevents stores from reaching it, while still
//! indicating success on return.

use async_trait::async_trait;

use crate::{Blob, BlobHandle, BlobSink, BlobSource, VersionOracle, VersionTag, error::Result};

/// Read-only snapshot backend.
///
/// Wraps another backend and silently drops every store, logging an
/// [`info event`](tracing::Event). Local writes still apply to the
/// in-memory database; they are simply never published.
#[derive(Clone)]
pub struct ReadOnlyBlob {
    inner: BlobHandle,
}
impl ReadOnlyBlob {
    pub fn new(inner: BlobHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl BlobSource for ReadOnlyBlob {
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        self.inner.fetch().await
    }
}

#[async_trait]
impl BlobSink for ReadOnlyBlob {
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        tracing::info!(backend = self.inner.name(), bytes = bytes.len(), "Skipping snapshot store during read-only mode");
        Ok(())
    }
}

#[async_trait]
impl VersionOracle for ReadOnlyBlob {
    async fn version(&self) -> Result<Option<VersionTag>> {
        self.inner.version().await
    }
}

impl Blob for ReadOnlyBlob {
    fn name(&self) -> &str {
        self.inner.name()
    }
}
