//! Local filesystem snapshot backend.
//!
//! Stores the snapshot as a single file below a configured root directory,
//! using `tokio::fs` for async I/O. Useful for development and for
//! deployments where the "remote" store is a network mount.

use crate::error::{ErrorKind, Result};
use crate::{Blob, BlobSink, BlobSource, VersionOracle, VersionTag, validate_key};
use async_trait::async_trait;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;

/// Local filesystem snapshot backend.
///
/// The version tag is built from file metadata (`{size}-{mtime in ns}`, plus
/// the inode on Unix), so checking freshness never reads the snapshot itself.
/// Every store writes a new file and renames it into place, which gives each
/// write a fresh inode. On other platforms, filesystems with coarse
/// timestamps (FAT, some network mounts) can give two same-size writes
/// within one tick the same tag.
///
/// # Examples
///
/// ```no_run
/// use sqlblob_storage::backend::LocalBlob;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let blob = LocalBlob::new("local", "/var/lib/app", "db/app.sqlite")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBlob {
    name: String,
    /// Absolute path of the snapshot file
    path: PathBuf,
}

impl LocalBlob {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the directory holding snapshots
    /// * `key` - Relative snapshot key below `root`
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not absolute, exists but is not a
    /// directory, or `key` fails validation.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>, key: impl AsRef<str>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root.display().to_string()));
            }
        } else {
            // Only happens once on construction; not worth an async constructor.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        let path = root.join(validate_key(key)?);
        Ok(Self { name: name.into(), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.display().to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    fn tag(metadata: &Metadata) -> Result<VersionTag> {
        let modified = OffsetDateTime::from(metadata.modified().map_err(ErrorKind::Io)?).unix_timestamp_nanos();
        #[cfg(unix)]
        let tag = {
            use std::os::unix::fs::MetadataExt;
            format!("{}-{}-{}", metadata.len(), modified, metadata.ino())
        };
        #[cfg(not(unix))]
        let tag = format!("{}-{}", metadata.len(), modified);
        Ok(VersionTag::new(tag))
    }

    /// Sibling path the snapshot is written to before being renamed into place.
    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".partial");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl BlobSource for LocalBlob {
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::map_io_error(e, &self.path).into()),
        }
    }
}

#[async_trait]
impl BlobSink for LocalBlob {
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, parent))?;
        }
        // Write then rename, so a concurrent reader never sees half a snapshot.
        let staging = self.staging_path();
        fs::write(&staging, bytes).await.map_err(|e| Self::map_io_error(e, &staging))?;
        fs::rename(&staging, &self.path).await.map_err(|e| Self::map_io_error(e, &self.path))?;
        Ok(())
    }
}

#[async_trait]
impl VersionOracle for LocalBlob {
    async fn version(&self) -> Result<Option<VersionTag>> {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::map_io_error(e, &self.path).into()),
        };
        Self::tag(&metadata).map(Some)
    }
}

impl Blob for LocalBlob {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(LocalBlob::new("name", temp_dir.path(), "app.sqlite").is_ok());
        assert!(LocalBlob::new("name", "relative/path", "app.sqlite").is_err());
        assert!(LocalBlob::new("name", temp_dir.path(), "../escape.sqlite").is_err());
    }

    #[test]
    fn test_new_creates_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("nested/root");
        let blob = LocalBlob::new("name", &root, "db/app.sqlite").unwrap();
        assert!(root.is_dir());
        assert_eq!(blob.path(), root.join("db/app.sqlite"));
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blob = LocalBlob::new("name", temp_dir.path(), "app.sqlite").unwrap();
        assert_eq!(blob.fetch().await.unwrap(), None);
        assert_eq!(blob.version().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_and_fetch() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blob = LocalBlob::new("name", temp_dir.path(), "db/app.sqlite").unwrap();
        blob.store(b"snapshot").await.unwrap();
        assert_eq!(blob.fetch().await.unwrap(), Some(b"snapshot".to_vec()));
        assert!(!blob.staging_path().exists());
    }

    #[tokio::test]
    async fn test_version_changes_with_size() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blob = LocalBlob::new("name", temp_dir.path(), "app.sqlite").unwrap();
        blob.store(b"one").await.unwrap();
        let first = blob.version().await.unwrap().unwrap();
        assert_eq!(blob.version().await.unwrap(), Some(first.clone()));
        blob.store(b"three").await.unwrap();
        assert_ne!(blob.version().await.unwrap().unwrap(), first);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_same_size_writes_get_distinct_tags() {
        let temp_dir = tempfile::tempdir().unwrap();
        let blob = LocalBlob::new("name", temp_dir.path(), "app.sqlite").unwrap();
        blob.store(b"aaaa").await.unwrap();
        let first = blob.version().await.unwrap().unwrap();
        // Back to back, so the timestamps may well be equal.
        blob.store(b"bbbb").await.unwrap();
        assert_ne!(blob.version().await.unwrap().unwrap(), first);
    }
}
