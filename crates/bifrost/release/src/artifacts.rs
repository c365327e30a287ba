//! Artifact storage boundary
//!
//! Packaged bundles are addressed by `{tag}/{version}/{bundle_id}/{file}`.
//! The engine only builds keys and asks whether they exist; the medium
//! behind [`ArtifactStore`] is pluggable.

use crate::error::{ReleaseError, ReleaseResult};
use async_trait::async_trait;
use bifrost_types::{Bundle, BundleId, Platform};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Public prefix of download paths.
pub const DOWNLOAD_PREFIX: &str = "bundles";

/// Location of one platform package of one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub tag: String,
    pub version: String,
    pub bundle_id: BundleId,
    pub platform: Platform,
}

impl ArtifactKey {
    pub fn for_bundle(bundle: &Bundle, platform: Platform) -> Self {
        Self {
            tag: bundle.tag.clone(),
            version: bundle.version.clone(),
            bundle_id: bundle.id.clone(),
            platform,
        }
    }

    pub fn file_name(&self) -> &'static str {
        self.platform.artifact_file_name()
    }

    /// `{tag}/{version}/{bundle_id}/{file}`
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.tag,
            self.version,
            self.bundle_id,
            self.file_name()
        )
    }

    /// Path clients download from, relative to the public storage root.
    pub fn download_path(&self) -> String {
        format!("{}/{}", DOWNLOAD_PREFIX, self.relative_path())
    }
}

/// Blob storage for packaged bundles.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn exists(&self, key: &ArtifactKey) -> ReleaseResult<bool>;

    /// Write (or overwrite) the package at `key`.
    async fn put(&self, key: &ArtifactKey, bytes: Vec<u8>) -> ReleaseResult<()>;
}

/// Filesystem artifact store rooted at `{storage_path}/bundles`.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(storage_path: impl AsRef<Path>) -> Self {
        Self {
            root: storage_path.as_ref().join(DOWNLOAD_PREFIX),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(&key.tag)
            .join(&key.version)
            .join(key.bundle_id.as_str())
            .join(key.file_name())
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn exists(&self, key: &ArtifactKey) -> ReleaseResult<bool> {
        let path = self.path_for(key);
        tokio::fs::try_exists(&path).await.map_err(|e| {
            ReleaseError::Artifact(format!("failed to stat {}: {e}", path.display()))
        })
    }

    async fn put(&self, key: &ArtifactKey, bytes: Vec<u8>) -> ReleaseResult<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ReleaseError::Artifact(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            ReleaseError::Artifact(format!(
                "failed to save {} bundle: {e}",
                key.platform.display_name()
            ))
        })?;
        tracing::debug!(path = %path.display(), "artifact written");
        Ok(())
    }
}

/// In-memory artifact store for tests.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ArtifactKey) -> ReleaseResult<Option<Vec<u8>>> {
        let guard = self
            .objects
            .read()
            .map_err(|_| ReleaseError::Artifact("artifact lock poisoned".to_string()))?;
        Ok(guard.get(&key.relative_path()).cloned())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn exists(&self, key: &ArtifactKey) -> ReleaseResult<bool> {
        let guard = self
            .objects
            .read()
            .map_err(|_| ReleaseError::Artifact("artifact lock poisoned".to_string()))?;
        Ok(guard.contains_key(&key.relative_path()))
    }

    async fn put(&self, key: &ArtifactKey, bytes: Vec<u8>) -> ReleaseResult<()> {
        let mut guard = self
            .objects
            .write()
            .map_err(|_| ReleaseError::Artifact("artifact lock poisoned".to_string()))?;
        guard.insert(key.relative_path(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(platform: Platform) -> ArtifactKey {
        ArtifactKey {
            tag: "prod".to_string(),
            version: "2.0.0".to_string(),
            bundle_id: BundleId::new("2.0.0-prod-AbCd1234"),
            platform,
        }
    }

    #[test]
    fn test_key_paths() {
        let android = key(Platform::Android);
        assert_eq!(
            android.relative_path(),
            "prod/2.0.0/2.0.0-prod-AbCd1234/index.android.bundle.zip"
        );
        assert_eq!(
            key(Platform::Ios).download_path(),
            "bundles/prod/2.0.0/2.0.0-prod-AbCd1234/main.jsbundle.zip"
        );
    }

    #[tokio::test]
    async fn test_fs_store_put_and_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let android = key(Platform::Android);

        assert!(!store.exists(&android).await.unwrap());
        store.put(&android, b"zip".to_vec()).await.unwrap();
        assert!(store.exists(&android).await.unwrap());
        assert!(!store.exists(&key(Platform::Ios)).await.unwrap());

        let on_disk = dir
            .path()
            .join("bundles/prod/2.0.0/2.0.0-prod-AbCd1234/index.android.bundle.zip");
        assert_eq!(std::fs::read(on_disk).unwrap(), b"zip");
    }

    #[tokio::test]
    async fn test_memory_store_overwrites() {
        let store = InMemoryArtifactStore::new();
        let ios = key(Platform::Ios);
        store.put(&ios, vec![1]).await.unwrap();
        store.put(&ios, vec![2]).await.unwrap();
        assert!(store.exists(&ios).await.unwrap());
        assert_eq!(store.get(&ios).unwrap(), Some(vec![2]));
        assert_eq!(store.get(&key(Platform::Android)).unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_store_reports_poisoned_lock() {
        let store = std::sync::Arc::new(InMemoryArtifactStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.objects.write().unwrap();
            panic!("poison the artifact lock");
        })
        .join();

        let ios = key(Platform::Ios);
        assert!(matches!(store.get(&ios), Err(ReleaseError::Artifact(_))));
        assert!(matches!(
            store.exists(&ios).await,
            Err(ReleaseError::Artifact(_))
        ));
    }
}
