//! Object key validation.
//!
//! The same key is used as an S3 object key and as a path below a local
//! root directory, so it has to be safe for both.

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a snapshot key.
///
/// Keys are `/`-separated. Empty and `.` segments are dropped, `..` removes
/// the previous segment and may never climb above the root. NUL bytes and
/// backslashes are rejected outright since they mean different things to
/// different backends.
///
/// # Examples
///
/// ```
/// use sqlblob_storage::validate_key;
/// assert_eq!(validate_key("db/app.sqlite").unwrap(), "db/app.sqlite");
/// assert_eq!(validate_key("/db//./old/../app.sqlite").unwrap(), "db/app.sqlite");
/// assert!(validate_key("../app.sqlite").is_err());
/// assert!(validate_key("db\\app.sqlite").is_err());
/// assert!(validate_key("").is_err());
/// ```
pub fn validate(key: impl AsRef<str>) -> Result<String> {
    let key = key.as_ref();
    if key.contains(['\0', '\\']) {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in key.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_string()));
                }
            },
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        exn::bail!(ErrorKind::InvalidKey(key.to_string()));
    }
    Ok(segments.join("/"))
}
