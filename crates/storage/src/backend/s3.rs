//! S3-compatible snapshot backend.
//!
//! Stores the snapshot as a single object in an S3-compatible service (AWS
//! S3, Backblaze B2, Tigris, MinIO, ...). The object's ETag doubles as the
//! version tag, fetched with a `HEAD` request so freshness checks never
//! download the snapshot.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration file.

use crate::error::{ErrorKind, Result};
use crate::{Blob, BlobSink, BlobSource, VersionOracle, VersionTag, validate_key};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, retry::RetryConfig},
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use exn::ResultExt;

/// S3-compatible snapshot backend.
///
/// # Examples
///
/// ```no_run
/// use sqlblob_storage::backend::S3Blob;
///
/// let blob = S3Blob::new(
///     "production",
///     "my-bucket",
///     "tenants/42/app.sqlite",
///     "us-west-004",
///     Some("https://s3.us-west-004.backblazeb2.com"),
///     "access_key_id",
///     "secret_access_key",
/// ).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct S3Blob {
    name: String,
    client: Client,
    bucket: String,
    key: String,
}

impl S3Blob {
    /// Create a new S3 snapshot backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in logging)
    /// * `bucket` - S3 bucket name
    /// * `key` - Object key of the snapshot
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        key: impl AsRef<str>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
    ) -> Result<Self> {
        let key = validate_key(key)?;
        let credentials = Credentials::new(key_id, key_secret, None, None, "sqlblob-config");
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(region.into()))
            // Exponential backoff: 1 initial attempt + 3 retries
            .retry_config(RetryConfig::standard().with_max_attempts(4))
            // Path-style addressing for S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        Ok(Self {
            name: name.into(),
            client: Client::from_conf(config_builder.build()),
            bucket: bucket.into(),
            key,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn network(err: &impl std::error::Error) -> ErrorKind {
        ErrorKind::Network(DisplayErrorContext(err).to_string())
    }
}

#[async_trait]
impl BlobSource for S3Blob {
    async fn fetch(&self) -> Result<Option<Vec<u8>>> {
        let response = self.client.get_object().bucket(&self.bucket).key(&self.key).send().await;
        let output = match response {
            Ok(output) => output,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => return Ok(None),
            Err(err) => exn::bail!(Self::network(&err)),
        };
        let bytes = output
            .body
            .collect()
            .await
            .or_raise(|| ErrorKind::Network(format!("reading body of s3://{}/{}", self.bucket, self.key)))?;
        Ok(Some(bytes.into_bytes().to_vec()))
    }
}

#[async_trait]
impl BlobSink for S3Blob {
    async fn store(&self, bytes: &[u8]) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .content_type("application/vnd.sqlite3")
            .body(ByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(|err| Self::network(&err))?;
        Ok(())
    }
}

#[async_trait]
impl VersionOracle for S3Blob {
    async fn version(&self) -> Result<Option<VersionTag>> {
        let response = self.client.head_object().bucket(&self.bucket).key(&self.key).send().await;
        match response {
            Ok(output) => Ok(output.e_tag().map(VersionTag::from)),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(None),
            Err(err) => exn::bail!(Self::network(&err)),
        }
    }
}

impl Blob for S3Blob {
    fn name(&self) -> &str {
        &self.name
    }
}
