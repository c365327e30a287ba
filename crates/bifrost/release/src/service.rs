//! Bundle service facade
//!
//! The one collaborator request handlers talk to. It applies the tag
//! allow-list, drives the store and artifact storage, and fires lifecycle
//! hooks after each committed transition. Hook tasks are never awaited.

use crate::artifacts::{ArtifactKey, ArtifactStore, FsArtifactStore};
use crate::config::{BifrostConfig, DatabaseConfig};
use crate::error::{ReleaseError, ReleaseResult};
use crate::resolver::{ReleaseResolver, Update, UpdateRequest};
use crate::rollback::RollbackSelector;
use bifrost_hooks::{HookDispatcher, HookSet};
use bifrost_store::{BundleStore, InMemoryBundleStore, SqliteBundleStore};
use bifrost_types::validation::validate_note;
use bifrost_types::{
    Bundle, BundleFilter, BundleId, BundleUpdate, LifecycleEvent, NewBundle, Platform,
    Transition, ValidationError,
};
use std::sync::Arc;

/// Platform packages received for one bundle.
#[derive(Debug, Clone, Default)]
pub struct UploadedArtifacts {
    pub android: Option<Vec<u8>>,
    pub ios: Option<Vec<u8>>,
}

impl UploadedArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn android(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.android = Some(bytes.into());
        self
    }

    pub fn ios(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.ios = Some(bytes.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.android.is_none() && self.ios.is_none()
    }

    fn into_parts(self) -> impl Iterator<Item = (Platform, Vec<u8>)> {
        [(Platform::Android, self.android), (Platform::Ios, self.ios)]
            .into_iter()
            .filter_map(|(platform, bytes)| bytes.map(|b| (platform, b)))
    }
}

/// Bundle lifecycle and release operations.
#[derive(Clone)]
pub struct BundleService {
    config: Arc<BifrostConfig>,
    store: Arc<dyn BundleStore>,
    artifacts: Arc<dyn ArtifactStore>,
    dispatcher: HookDispatcher,
    resolver: ReleaseResolver,
    rollback: RollbackSelector,
}

impl BundleService {
    pub fn new(
        config: Arc<BifrostConfig>,
        store: Arc<dyn BundleStore>,
        artifacts: Arc<dyn ArtifactStore>,
        hooks: HookSet,
    ) -> Self {
        let dispatcher = HookDispatcher::new(hooks, config.environment_name.clone())
            .with_policy(config.hooks);
        Self {
            resolver: ReleaseResolver::new(store.clone(), artifacts.clone()),
            rollback: RollbackSelector::new(store.clone()),
            config,
            store,
            artifacts,
            dispatcher,
        }
    }

    /// Build the configured store, filesystem artifact storage and hooks.
    pub async fn from_config(config: BifrostConfig) -> ReleaseResult<Self> {
        let store: Arc<dyn BundleStore> = match &config.database {
            DatabaseConfig::Memory => Arc::new(InMemoryBundleStore::new()),
            DatabaseConfig::Sqlite { path } => Arc::new(SqliteBundleStore::open(path).await?),
        };
        let artifacts = Arc::new(FsArtifactStore::new(&config.storage_path));
        let hooks = config.default_hooks();

        tracing::info!(
            environment = %config.environment_name,
            database = ?config.database,
            storage_path = %config.storage_path.display(),
            tags = config.tags.len(),
            hooks = ?hooks,
            "bundle service configured"
        );
        Ok(Self::new(Arc::new(config), store, artifacts, hooks))
    }

    pub fn config(&self) -> &BifrostConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BundleStore> {
        &self.store
    }

    /// Create a bundle record ahead of its upload.
    pub async fn reserve(&self, request: NewBundle, author: &str) -> ReleaseResult<Bundle> {
        request.validate()?;
        self.ensure_tag(&request.tag)?;

        let bundle = Bundle::create(
            request.version,
            request.tag,
            request.note.unwrap_or_default(),
            author,
        );
        self.store.save(&bundle).await?;

        tracing::info!(
            bundle_id = %bundle.id,
            version = %bundle.version,
            tag = %bundle.tag,
            author = %bundle.author,
            "bundle reserved"
        );
        self.dispatcher.dispatch(LifecycleEvent::Reserve, &bundle);
        Ok(bundle)
    }

    /// Store the platform packages of a reserved bundle.
    pub async fn upload(&self, id: &BundleId, files: UploadedArtifacts) -> ReleaseResult<Bundle> {
        if files.is_empty() {
            return Err(ValidationError::MissingArtifacts.into());
        }
        let bundle = self.get(id).await?;

        for (platform, bytes) in files.into_parts() {
            let size = bytes.len();
            self.artifacts
                .put(&ArtifactKey::for_bundle(&bundle, platform), bytes)
                .await?;
            tracing::info!(bundle_id = %bundle.id, %platform, size, "bundle uploaded");
        }

        self.dispatcher.dispatch(LifecycleEvent::Push, &bundle);
        Ok(bundle)
    }

    pub async fn get(&self, id: &BundleId) -> ReleaseResult<Bundle> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| ReleaseError::NotFound(format!("bundle {id}")))
    }

    /// Active bundles of an allowed tag, newest first.
    pub async fn list(&self, tag: &str) -> ReleaseResult<Vec<Bundle>> {
        self.ensure_tag(tag)?;
        self.list_filtered(&BundleFilter::new().tag(tag)).await
    }

    pub async fn list_filtered(&self, filter: &BundleFilter) -> ReleaseResult<Vec<Bundle>> {
        Ok(self.store.list(filter).await?)
    }

    /// Apply a partial update. An update with nothing to write is logged and
    /// returns the bundle unchanged.
    pub async fn update(&self, id: &BundleId, update: &BundleUpdate) -> ReleaseResult<Bundle> {
        if let Some(note) = &update.note {
            validate_note(note)?;
        }

        match self.store.update(id, update).await {
            Ok(bundle) => {
                tracing::info!(bundle_id = %id, "bundle updated");
                Ok(bundle)
            }
            Err(err) if err.is_warning() => {
                tracing::warn!(bundle_id = %id, error = %err, "bundle update skipped");
                self.get(id).await
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update_note(&self, id: &BundleId, note: impl Into<String>) -> ReleaseResult<Bundle> {
        self.update(id, &BundleUpdate::note(note)).await
    }

    /// Retire a bundle. Only the call that performs the flip fires the hook.
    pub async fn dispose(&self, id: &BundleId) -> ReleaseResult<Transition> {
        let (transition, bundle) = self.store.set_disposed(id, true).await?;
        match transition {
            Transition::Applied => {
                tracing::info!(bundle_id = %id, version = %bundle.version, "bundle disposed");
                self.dispatcher.dispatch(LifecycleEvent::Dispose, &bundle);
            }
            Transition::Unchanged => {
                tracing::warn!(bundle_id = %id, "bundle already disposed");
            }
        }
        Ok(transition)
    }

    /// Make a disposed bundle eligible again. Fires no hook.
    pub async fn recover(&self, id: &BundleId) -> ReleaseResult<Transition> {
        let transition = self.store.recover(id).await?;
        if transition.is_applied() {
            tracing::info!(bundle_id = %id, "bundle recovered");
        } else {
            tracing::warn!(bundle_id = %id, "bundle already active");
        }
        Ok(transition)
    }

    /// Dispose the latest active bundle of an allowed tag.
    pub async fn rollback(&self, tag: &str) -> ReleaseResult<Bundle> {
        self.ensure_tag(tag)?;
        let bundle = self.rollback.rollback(tag).await?;
        self.dispatcher.dispatch(LifecycleEvent::Rollback, &bundle);
        Ok(bundle)
    }

    /// Answer a client update poll.
    pub async fn resolve(
        &self,
        platform: &str,
        version: &str,
        tag: &str,
        current_bundle: Option<&str>,
    ) -> ReleaseResult<Update> {
        let request = UpdateRequest::parse(platform, version, tag, current_bundle)?;
        self.resolver.resolve(&request).await
    }

    fn ensure_tag(&self, tag: &str) -> ReleaseResult<()> {
        if self.config.is_tag_allowed(tag) {
            Ok(())
        } else {
            Err(ReleaseError::UnknownTag(tag.to_string()))
        }
    }
}
