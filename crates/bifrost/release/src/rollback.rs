//! Tag rollback
//!
//! Rolling back a tag disposes its most recent active bundle. Nothing is
//! marked current: resolution simply stops seeing the disposed bundle and
//! falls through to the next latest by `created_at`.

use crate::error::{ReleaseError, ReleaseResult};
use bifrost_store::BundleStore;
use bifrost_types::{Bundle, Transition};
use std::sync::Arc;

/// Picks and disposes the latest active bundle of a tag.
#[derive(Clone)]
pub struct RollbackSelector {
    store: Arc<dyn BundleStore>,
}

impl RollbackSelector {
    pub fn new(store: Arc<dyn BundleStore>) -> Self {
        Self { store }
    }

    /// Dispose the latest active bundle for `tag` and return it.
    ///
    /// Every successful call corresponds to exactly one applied disposal. If
    /// another caller disposes the selected bundle first, the next latest is
    /// selected instead.
    pub async fn rollback(&self, tag: &str) -> ReleaseResult<Bundle> {
        loop {
            let Some(latest) = self.store.latest_active_for_tag(tag).await? else {
                return Err(ReleaseError::NotFound(format!(
                    "no active bundle to roll back for tag {tag}"
                )));
            };

            match self.store.set_disposed(&latest.id, true).await? {
                (Transition::Applied, disposed) => {
                    tracing::info!(
                        tag,
                        bundle_id = %disposed.id,
                        version = %disposed.version,
                        "rolled back tag"
                    );
                    return Ok(disposed);
                }
                (Transition::Unchanged, _) => {
                    tracing::debug!(
                        tag,
                        bundle_id = %latest.id,
                        "bundle disposed concurrently, reselecting"
                    );
                }
            }
        }
    }
}
