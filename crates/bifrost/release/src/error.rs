//! Error types for the release engine

use bifrost_store::StoreError;
use bifrost_types::{Platform, ValidationError};
use std::fmt;
use thiserror::Error;

/// Why a client poll produced nothing to download.
///
/// Clients treat every variant as "stay on the current bundle". Operators
/// need them apart, so each one is logged under its own reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoUpdate {
    /// No active bundle exists for the version and tag.
    NoRelease,
    /// The client already runs the latest active bundle.
    AlreadyCurrent,
    /// The bundle record exists but its platform package was never uploaded.
    ArtifactMissing(Platform),
}

impl NoUpdate {
    /// Short machine-readable reason, for structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            NoUpdate::NoRelease => "no_release",
            NoUpdate::AlreadyCurrent => "already_current",
            NoUpdate::ArtifactMissing(_) => "artifact_missing",
        }
    }
}

impl fmt::Display for NoUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoUpdate::NoRelease => f.write_str("no updates found for this version and platform"),
            NoUpdate::AlreadyCurrent => f.write_str("already at the latest version"),
            NoUpdate::ArtifactMissing(platform) => {
                write!(f, "{} bundle not found", platform.display_name())
            }
        }
    }
}

/// Release-engine errors
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Rejected caller input
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Tag outside the configured allow-list
    #[error("invalid tag specified: {0}")]
    UnknownTag(String),

    /// Bundle or tag has nothing to act on
    #[error("not found: {0}")]
    NotFound(String),

    /// Nothing to update to
    #[error("{0}")]
    NoUpdate(NoUpdate),

    /// Persistence failure
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Artifact read/write failure
    #[error("artifact storage error: {0}")]
    Artifact(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl ReleaseError {
    /// Caller's fault; maps to a 4xx response.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReleaseError::Validation(_) | ReleaseError::UnknownTag(_)
        ) || self.is_not_found()
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ReleaseError::NotFound(_)
                | ReleaseError::NoUpdate(_)
                | ReleaseError::Store(StoreError::NotFound(_))
        )
    }

    pub fn no_update(&self) -> Option<NoUpdate> {
        match self {
            ReleaseError::NoUpdate(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Result type alias for release operations
pub type ReleaseResult<T> = Result<T, ReleaseError>;
