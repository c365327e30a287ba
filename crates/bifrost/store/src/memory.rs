//! In-memory reference implementation of [`BundleStore`].
//!
//! Deterministic and test-friendly. Every physical write bumps a counter so
//! callers can assert that idempotent operations really skip the write.
//! Production deployments should use [`crate::SqliteBundleStore`].

use crate::traits::BundleStore;
use crate::{StoreError, StoreResult};
use async_trait::async_trait;
use bifrost_types::{Bundle, BundleFilter, BundleId, BundleUpdate, Transition};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

struct Entry {
    /// Insertion sequence; breaks `created_at` ties newest-first.
    seq: u64,
    bundle: Bundle,
}

/// In-memory bundle store.
#[derive(Default)]
pub struct InMemoryBundleStore {
    bundles: RwLock<HashMap<BundleId, Entry>>,
    writes: AtomicU64,
}

impl InMemoryBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical writes (inserts and updates) performed so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BundleStore for InMemoryBundleStore {
    async fn save(&self, bundle: &Bundle) -> StoreResult<()> {
        let mut guard = self
            .bundles
            .write()
            .map_err(|_| StoreError::Backend("bundles lock poisoned".to_string()))?;

        if guard.contains_key(&bundle.id) {
            return Err(StoreError::Conflict(format!(
                "bundle {} already exists",
                bundle.id
            )));
        }

        let seq = guard.len() as u64;
        guard.insert(
            bundle.id.clone(),
            Entry {
                seq,
                bundle: bundle.clone(),
            },
        );
        self.record_write();
        Ok(())
    }

    async fn get_by_id(&self, id: &BundleId) -> StoreResult<Option<Bundle>> {
        let guard = self
            .bundles
            .read()
            .map_err(|_| StoreError::Backend("bundles lock poisoned".to_string()))?;
        Ok(guard.get(id).map(|entry| entry.bundle.clone()))
    }

    async fn get_by_version_tag(&self, version: &str, tag: &str) -> StoreResult<Option<Bundle>> {
        let filter = BundleFilter::new().version(version).tag(tag).limit(1);
        let mut latest = self.list(&filter).await?;
        Ok(latest.pop())
    }

    async fn list(&self, filter: &BundleFilter) -> StoreResult<Vec<Bundle>> {
        let guard = self
            .bundles
            .read()
            .map_err(|_| StoreError::Backend("bundles lock poisoned".to_string()))?;

        let mut matches = guard
            .values()
            .filter(|entry| matches_filter(&entry.bundle, filter))
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| {
            b.bundle
                .created_at
                .cmp(&a.bundle.created_at)
                .then(b.seq.cmp(&a.seq))
        });

        let offset = filter.offset.unwrap_or(0);
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|entry| entry.bundle.clone())
            .collect())
    }

    async fn update(&self, id: &BundleId, update: &BundleUpdate) -> StoreResult<Bundle> {
        if update.is_empty() {
            return Err(StoreError::NoChanges(format!(
                "no fields provided to update for bundle {}",
                id
            )));
        }

        let mut guard = self
            .bundles
            .write()
            .map_err(|_| StoreError::Backend("bundles lock poisoned".to_string()))?;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("bundle {} not found", id)))?;

        if let Some(note) = &update.note {
            entry.bundle.note = note.clone();
        }
        self.record_write();
        Ok(entry.bundle.clone())
    }

    async fn set_disposed(
        &self,
        id: &BundleId,
        disposed: bool,
    ) -> StoreResult<(Transition, Bundle)> {
        // Check and flip under one write lock.
        let mut guard = self
            .bundles
            .write()
            .map_err(|_| StoreError::Backend("bundles lock poisoned".to_string()))?;
        let entry = guard
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("bundle {} not found", id)))?;

        if entry.bundle.is_disposed == disposed {
            return Ok((Transition::Unchanged, entry.bundle.clone()));
        }

        entry.bundle.is_disposed = disposed;
        self.record_write();
        Ok((Transition::Applied, entry.bundle.clone()))
    }
}

fn matches_filter(bundle: &Bundle, filter: &BundleFilter) -> bool {
    if !filter.include_disposed && bundle.is_disposed {
        return false;
    }
    if filter.tag.as_ref().is_some_and(|tag| *tag != bundle.tag) {
        return false;
    }
    if filter
        .author
        .as_ref()
        .is_some_and(|author| *author != bundle.author)
    {
        return false;
    }
    if filter
        .version
        .as_ref()
        .is_some_and(|version| *version != bundle.version)
    {
        return false;
    }
    true
}
