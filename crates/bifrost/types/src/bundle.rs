//! The bundle entity

use crate::ids::BundleId;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One immutable release artifact set plus its metadata.
///
/// Only `note` and `is_disposed` ever change after creation, and only through
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub version: String,
    pub tag: String,
    pub note: String,
    pub author: String,
    pub is_disposed: bool,
    pub created_at: DateTime<Utc>,
}

impl Bundle {
    /// Build a new active bundle with a freshly generated id.
    ///
    /// The bundle is **not** persisted; hand it to the store's `save`.
    pub fn create(
        version: impl Into<String>,
        tag: impl Into<String>,
        note: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        let version = version.into();
        let tag = tag.into();
        Self {
            id: BundleId::generate(&version, &tag),
            version,
            tag,
            note: note.into(),
            author: author.into(),
            is_disposed: false,
            // Millisecond precision matches the persisted text form.
            created_at: Utc::now().trunc_subsecs(3),
        }
    }

    /// Is this bundle eligible to be served?
    pub fn is_active(&self) -> bool {
        !self.is_disposed
    }
}
