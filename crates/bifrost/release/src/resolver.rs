//! Release resolution for polling clients
//!
//! Answers "is there a newer bundle for my platform, version and tag?". The
//! resolver only reads; it never changes bundle state.

use crate::artifacts::{ArtifactKey, ArtifactStore};
use crate::error::{NoUpdate, ReleaseError, ReleaseResult};
use bifrost_store::BundleStore;
use bifrost_types::{BundleId, Platform, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A client's update poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub platform: Platform,
    pub version: String,
    pub tag: String,
    /// Bundle the client currently runs, if any.
    pub current_bundle: Option<BundleId>,
}

impl UpdateRequest {
    /// Validate raw poll parameters.
    pub fn parse(
        platform: &str,
        version: &str,
        tag: &str,
        current_bundle: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let platform = platform.parse::<Platform>()?;
        if version.is_empty() {
            return Err(ValidationError::Required("version"));
        }
        if tag.is_empty() {
            return Err(ValidationError::Required("tag"));
        }
        Ok(Self {
            platform,
            version: version.to_string(),
            tag: tag.to_string(),
            current_bundle: current_bundle.map(BundleId::from),
        })
    }
}

/// Where to fetch the newer bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update {
    pub download: String,
    /// Sent back by the client as its current bundle on the next poll.
    #[serde(rename = "bundleId")]
    pub bundle_id: BundleId,
}

/// Resolves update polls against the bundle store and artifact storage.
#[derive(Clone)]
pub struct ReleaseResolver {
    store: Arc<dyn BundleStore>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl ReleaseResolver {
    pub fn new(store: Arc<dyn BundleStore>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self { store, artifacts }
    }

    pub async fn resolve(&self, request: &UpdateRequest) -> ReleaseResult<Update> {
        let Some(bundle) = self
            .store
            .get_by_version_tag(&request.version, &request.tag)
            .await?
        else {
            return Err(self.no_update(request, NoUpdate::NoRelease));
        };

        if request.current_bundle.as_ref() == Some(&bundle.id) {
            return Err(self.no_update(request, NoUpdate::AlreadyCurrent));
        }

        let key = ArtifactKey::for_bundle(&bundle, request.platform);
        if !self.artifacts.exists(&key).await? {
            return Err(self.no_update(request, NoUpdate::ArtifactMissing(request.platform)));
        }

        tracing::info!(
            platform = %request.platform,
            version = %request.version,
            tag = %request.tag,
            bundle_id = %bundle.id,
            "serving update"
        );
        Ok(Update {
            download: key.download_path(),
            bundle_id: bundle.id,
        })
    }

    fn no_update(&self, request: &UpdateRequest, reason: NoUpdate) -> ReleaseError {
        tracing::info!(
            platform = %request.platform,
            version = %request.version,
            tag = %request.tag,
            current_bundle = request.current_bundle.as_ref().map(BundleId::as_str),
            reason = reason.reason(),
            "no update"
        );
        ReleaseError::NoUpdate(reason)
    }
}
