use crate::Detection;
use serde::{Deserialize, Serialize};

/// What to do with the cached version tag when the oracle has no answer.
///
/// A reload happens either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentTag {
    /// Keep the last known tag, so one failed version check costs a single
    /// reload instead of two.
    #[default]
    ReloadAndKeep,
    /// Forget the cached tag. The next successful check reloads again.
    ReloadAndClear,
}

/// Tuning knobs for a [`CachedHandle`](crate::CachedHandle).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Options {
    pub detection: Detection,
    pub absent_tag: AbsentTag,
    /// Ask the oracle for the new tag after every successful store, so the
    /// handle does not reload its own write on the next statement.
    ///
    /// Off by default. The oracle is read after the store, so a write by
    /// someone else in between is adopted as our own and never loaded.
    /// Only enable it when this handle is the sole writer.
    pub refresh_tag_after_store: bool,
}

impl Options {
    pub fn with_detection(mut self, detection: Detection) -> Self {
        self.detection = detection;
        self
    }

    pub fn with_absent_tag(mut self, absent_tag: AbsentTag) -> Self {
        self.absent_tag = absent_tag;
        self
    }

    pub fn with_refresh_tag_after_store(mut self, refresh: bool) -> Self {
        self.refresh_tag_after_store = refresh;
        self
    }
}
