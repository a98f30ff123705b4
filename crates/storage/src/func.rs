//! Closure adapters for the collaborator traits.
//!
//! Lets callers inject plain async functions instead of implementing the
//! traits by hand:
//!
//! ```
//! use sqlblob_storage::{BlobSink, BlobSource, VersionTag, oracle_fn, sink_fn, source_fn};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = source_fn(|| async { Ok(None) });
//! let sink = sink_fn(|bytes: Vec<u8>| async move { Ok(!bytes.is_empty()) });
//! let oracle = oracle_fn(|| async { Ok(Some(VersionTag::from("v1"))) });
//!
//! assert_eq!(source.fetch().await.unwrap(), None);
//! assert!(sink.store(b"").await.is_err());
//! # let _ = oracle;
//! # }
//! ```

use crate::error::{ErrorKind, Result};
use crate::{BlobSink, BlobSource, VersionOracle, VersionTag};
use async_trait::async_trait;
use std::future::Future;

/// [`BlobSource`] backed by an async closure.
pub struct FnSource<F>(F);

/// [`BlobSink`] backed by an async closure returning whether the snapshot
/// was kept. `Ok(false)` becomes [`ErrorKind::Rejected`].
pub struct FnSink<F>(F);

/// [`VersionOracle`] backed by an async closure.
pub struct FnOracle<F>(F);

pub fn source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Vec<u8>>>> + Send,
{
    FnSource(f)
}

pub fn sink_fn<F, Fut>(f: F) -> FnSink<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    FnSink(f)
}

pub fn oracle_fn<F, Fut>(f: F) -> FnOracle<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<VersionTag>>> + Send,
{
    FnOracle(f)
}

#[async_trait]
impl<F, Fut> BlobSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Vec<u8>>>> + Send,
{
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        (self.0)().await
    }
}

#[async_trait]
impl<F, Fut> BlobSink for FnSink<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        match (self.0)(bytes.to_vec()).await? {
            true => Ok(()),
            false => exn::bail!(ErrorKind::Rejected),
        }
    }
}

#[async_trait]
impl<F, Fut> VersionOracle for FnOracle<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<VersionTag>>> + Send,
{
    async fn version(&self) -> Result<Option<VersionTag>> {
        (self.0)().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_sink_false_is_rejected() {
        let sink = sink_fn(|_bytes| async { Ok(false) });
        let err = sink.store(b"snapshot").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Rejected));
    }

    #[tokio::test]
    async fn test_sink_receives_bytes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let sink = sink_fn(move |bytes: Vec<u8>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(bytes.len(), Ordering::SeqCst);
                Ok(true)
            }
        });
        sink.store(b"12345").await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let source = source_fn(|| async { Err(exn::Exn::from(ErrorKind::Network("unreachable".to_string()))) });
        assert!(matches!(&*source.fetch().await.unwrap_err(), ErrorKind::Network(_)));
    }

    #[tokio::test]
    async fn test_oracle() {
        let oracle = oracle_fn(|| async { Ok(Some(VersionTag::from("etag"))) });
        assert_eq!(oracle.version().await.unwrap(), Some(VersionTag::from("etag")));
    }
}
