//! In-memory snapshot backend for testing.

use crate::error::{ErrorKind, Result};
use crate::{Blob, BlobSink, BlobSource, VersionOracle, VersionTag};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory snapshot backend for testing.
///
/// The snapshot lives behind a [`RwLock`], so all trait methods can operate
/// on `&self` without external synchronisation. Every call is counted and
/// each capability can be made to fail on demand, which is what protocol
/// tests need to observe: how often a snapshot was fetched, stored or
/// version-checked.
///
/// The version tag is the BLAKE3 hash of the current content, so it changes
/// exactly when the content does.
///
/// # Examples
///
/// ```
/// use sqlblob_storage::backend::MemoryBlob;
/// use sqlblob_storage::{BlobSink, BlobSource};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let blob = MemoryBlob::default();
/// assert_eq!(blob.fetch().await.unwrap(), None);
///
/// blob.store(b"snapshot").await.unwrap();
/// assert_eq!(blob.fetch().await.unwrap().as_deref(), Some(&b"snapshot"[..]));
/// assert_eq!(blob.store_count(), 1);
/// # }
/// ```
pub struct MemoryBlob {
    name: String,
    content: RwLock<Option<Vec<u8>>>,
    fetches: AtomicUsize,
    stores: AtomicUsize,
    versions: AtomicUsize,
    fail_fetch: AtomicBool,
    fail_store: AtomicBool,
    fail_version: AtomicBool,
}

impl MemoryBlob {
    /// Create a backend that already holds a snapshot.
    pub fn with_content(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(Some(bytes.into()))
    }

    fn new(content: Option<Vec<u8>>) -> Self {
        Self {
            name: "memory".to_string(),
            content: RwLock::new(content),
            fetches: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
            versions: AtomicUsize::new(0),
            fail_fetch: AtomicBool::new(false),
            fail_store: AtomicBool::new(false),
            fail_version: AtomicBool::new(false),
        }
    }

    /// Change the name of the backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the snapshot behind the backend's back, as another writer
    /// would. Not counted as a store.
    pub async fn replace(&self, bytes: impl Into<Vec<u8>>) {
        *self.content.write().await = Some(bytes.into());
    }

    /// Current snapshot content, without counting as a fetch.
    pub async fn content(&self) -> Option<Vec<u8>> {
        self.content.read().await.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn version_count(&self) -> usize {
        self.versions.load(Ordering::SeqCst)
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_store(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    pub fn fail_version(&self, fail: bool) {
        self.fail_version.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemoryBlob {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl BlobSource for MemoryBlob {
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Injected("fetch"));
        }
        Ok(self.content.read().await.clone())
    }
}

#[async_trait]
impl BlobSink for MemoryBlob {
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        if self.fail_store.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Injected("store"));
        }
        *self.content.write().await = Some(bytes.to_vec());
        Ok(())
    }
}

#[async_trait]
impl VersionOracle for MemoryBlob {
    async fn version(&self) -> Result<Option<VersionTag>> {
        self.versions.fetch_add(1, Ordering::SeqCst);
        if self.fail_version.load(Ordering::SeqCst) {
            exn::bail!(ErrorKind::Injected("version"));
        }
        Ok(self.content.read().await.as_deref().map(VersionTag::of_content))
    }
}

impl Blob for MemoryBlob {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_fetch() {
        let blob = MemoryBlob::default();
        blob.store(b"hello").await.unwrap();
        assert_eq!(blob.fetch().await.unwrap(), Some(b"hello".to_vec()));
        assert_eq!((blob.fetch_count(), blob.store_count()), (1, 1));
    }

    #[tokio::test]
    async fn test_version_follows_content() {
        let blob = MemoryBlob::default();
        assert_eq!(blob.version().await.unwrap(), None);
        blob.replace(b"one".to_vec()).await;
        let first = blob.version().await.unwrap();
        assert_eq!(first, Some(VersionTag::of_content(b"one")));
        assert_eq!(blob.version().await.unwrap(), first);
        blob.replace(b"two".to_vec()).await;
        assert_ne!(blob.version().await.unwrap(), first);
        assert_eq!(blob.version_count(), 4);
        assert_eq!(blob.store_count(), 0);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let blob = MemoryBlob::with_content(b"data".to_vec());
        blob.fail_fetch(true);
        blob.fail_store(true);
        blob.fail_version(true);
        assert!(matches!(&*blob.fetch().await.unwrap_err(), ErrorKind::Injected("fetch")));
        assert!(matches!(&*blob.store(b"x").await.unwrap_err(), ErrorKind::Injected("store")));
        assert!(matches!(&*blob.version().await.unwrap_err(), ErrorKind::Injected("version")));
        // Failed store leaves content untouched.
        assert_eq!(blob.content().await, Some(b"data".to_vec()));
        blob.fail_fetch(false);
        assert_eq!(blob.fetch().await.unwrap(), Some(b"data".to_vec()));
    }
}
