//! Query filters, partial updates and write outcomes

use serde::{Deserialize, Serialize};

/// Filter for bundle listings.
///
/// Disposed bundles are excluded unless `include_disposed` is set. Results are
/// always ordered newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleFilter {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub include_disposed: bool,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl BundleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn include_disposed(mut self, include: bool) -> Self {
        self.include_disposed = include;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Partial update of a bundle's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUpdate {
    #[serde(default)]
    pub note: Option<String>,
}

impl BundleUpdate {
    pub fn note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
        }
    }

    /// True when no field would be written.
    pub fn is_empty(&self) -> bool {
        self.note.is_none()
    }
}

/// Outcome of a conditional state write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// This call performed the write.
    Applied,
    /// The record already held the target state; nothing was written.
    Unchanged,
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}
