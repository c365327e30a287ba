use crate::StoreResult;
use async_trait::async_trait;
use bifrost_types::{Bundle, BundleFilter, BundleId, BundleUpdate, Transition};

/// Storage interface for bundle records.
///
/// Implementations never validate tags against an allow-list; that is the
/// caller's job.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Insert a bundle built with [`Bundle::create`]. A duplicate id fails with
    /// `StoreError::Conflict`.
    async fn save(&self, bundle: &Bundle) -> StoreResult<()>;

    /// Get one bundle by id, disposed or not.
    async fn get_by_id(&self, id: &BundleId) -> StoreResult<Option<Bundle>>;

    /// Latest active bundle with exactly this version and tag.
    async fn get_by_version_tag(&self, version: &str, tag: &str) -> StoreResult<Option<Bundle>>;

    /// List bundles newest-first.
    async fn list(&self, filter: &BundleFilter) -> StoreResult<Vec<Bundle>>;

    /// Apply a partial update and return the updated record.
    ///
    /// An empty update fails with `StoreError::NoChanges` without writing.
    async fn update(&self, id: &BundleId, update: &BundleUpdate) -> StoreResult<Bundle>;

    /// Set `is_disposed` to `disposed` if it differs.
    ///
    /// Returns `Transition::Applied` only for the call that performed the
    /// write, together with the record as it stands after the call. An
    /// applied flip never needs a follow-up read.
    async fn set_disposed(
        &self,
        id: &BundleId,
        disposed: bool,
    ) -> StoreResult<(Transition, Bundle)>;

    async fn dispose(&self, id: &BundleId) -> StoreResult<Transition> {
        let (transition, _) = self.set_disposed(id, true).await?;
        Ok(transition)
    }

    async fn recover(&self, id: &BundleId) -> StoreResult<Transition> {
        let (transition, _) = self.set_disposed(id, false).await?;
        Ok(transition)
    }

    /// Latest active bundle for a tag, across all versions.
    async fn latest_active_for_tag(&self, tag: &str) -> StoreResult<Option<Bundle>> {
        let mut latest = self.list(&BundleFilter::new().tag(tag).limit(1)).await?;
        Ok(latest.pop())
    }
}
