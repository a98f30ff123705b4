//! Layered configuration for sqlblob.
//!
//! Values are merged from, in increasing priority:
//!
//! 1. built-in defaults (an in-memory backend, no compression),
//! 2. a TOML, YAML or JSON file, picked by extension,
//! 3. `SQLBLOB_` environment variables, where `__` separates nesting levels
//!    (`SQLBLOB_BACKEND__BUCKET` sets `backend.bucket`).
//!
//! ```toml
//! read_only = false
//! compression = "gzip"
//!
//! [backend]
//! type = "s3"
//! bucket = "databases"
//! key = "app/main.sqlite"
//! region = "eu-central-003"
//! endpoint = "https://s3.eu-central-003.backblazeb2.com"
//! key_id = "..."
//! key_secret = "..."
//!
//! [handle]
//! detection = "tokenized"
//! absent_tag = "reload_and_keep"
//! refresh_tag_after_store = false
//! surface_persistence_errors = true
//! ```

pub mod error;

use crate::error::{Error, ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use sqlblob_compress::Compression;
use sqlblob_handle::Options;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "SQLBLOB_";
const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    /// Never write snapshots back; statements still run locally.
    pub read_only: bool,
    /// Envelope applied to stored snapshots. Reading detects the format on
    /// its own.
    #[serde(with = "compression")]
    pub compression: Compression,
    pub handle: HandleConfig,
}

/// Where the snapshot lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Backend {
    /// Process-local and lost on exit. Useful for trying statements out.
    #[default]
    Memory,
    Local {
        root: PathBuf,
        key: String,
    },
    S3 {
        bucket: String,
        key: String,
        #[serde(default = "default_region")]
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        key_secret: String,
    },
}

impl Backend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Local { .. } => "local",
            Self::S3 { .. } => "s3",
        }
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HandleConfig {
    #[serde(flatten)]
    pub options: Options,
    /// Treat a failed write-back as a failed statement. When off, the
    /// failure is only logged.
    pub surface_persistence_errors: bool,
}

impl Default for HandleConfig {
    fn default() -> Self {
        Self {
            options: Options::default(),
            surface_persistence_errors: true,
        }
    }
}

impl Config {
    /// Load, merge and validate configuration.
    ///
    /// An explicit `path` must exist. Without one, the per-user default
    /// location is used when a file is present there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let figment = match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.display().to_string())),
            Some(path) => Self::figment(Some(path)),
            None => Self::figment(default_path().filter(|path| path.is_file()).as_deref()),
        };
        let config: Self = figment
            .extract()
            .map_err(|err| Error::from(ErrorKind::Parse(err.to_string())))?;
        config.validate()?;
        tracing::debug!(
            backend = config.backend.kind(),
            read_only = config.read_only,
            compression = %config.compression,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The merged provider stack, before extraction.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = match path.extension().and_then(OsStr::to_str) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        match &self.backend {
            Backend::Memory => {},
            Backend::Local { root, key } => {
                if !root.is_absolute() {
                    exn::bail!(ErrorKind::Invalid("backend.root".to_string()));
                }
                sqlblob_storage::validate_key(key).or_raise(|| ErrorKind::Invalid("backend.key".to_string()))?;
            },
            Backend::S3 { bucket, key, region, key_id, key_secret, .. } => {
                let required = [
                    ("backend.bucket", bucket),
                    ("backend.region", region),
                    ("backend.key_id", key_id),
                    ("backend.key_secret", key_secret),
                ];
                if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
                    exn::bail!(ErrorKind::Invalid(field.to_string()));
                }
                sqlblob_storage::validate_key(key).or_raise(|| ErrorKind::Invalid("backend.key".to_string()))?;
            },
        }
        Ok(())
    }
}

/// Per-user configuration file, e.g. `~/.config/sqlblob/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sqlblob").map(|dirs| dirs.config_dir().join("config.toml"))
}

mod compression {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use sqlblob_compress::Compression;

    pub fn serialize<S: Serializer>(compression: &Compression, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(compression.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Compression, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(|err: sqlblob_compress::error::Error| D::Error::custom(&*err))
    }
}
