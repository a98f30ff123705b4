use std::fmt::{Display, Formatter, Result as FmtResult};

/// Opaque, comparable marker for one state of a remote snapshot.
///
/// Usually an ETag or a content hash. Two tags are only ever compared for
/// equality; nothing is inferred from their contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Tag derived from the snapshot bytes themselves (BLAKE3, hex encoded).
    pub fn of_content(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VersionTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl From<String> for VersionTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for VersionTag {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_tag_is_stable() {
        assert_eq!(VersionTag::of_content(b"abc"), VersionTag::of_content(b"abc"));
        assert_ne!(VersionTag::of_content(b"abc"), VersionTag::of_content(b"abd"));
        assert_eq!(VersionTag::of_content(b"").as_str().len(), 64);
    }

    #[test]
    fn test_display_is_raw_value() {
        assert_eq!(VersionTag::from("\"9b2cf535f27731c974343645a3985328\"").to_string(), "\"9b2cf535f27731c974343645a3985328\"");
    }
}
