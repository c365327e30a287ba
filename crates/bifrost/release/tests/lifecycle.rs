//! End-to-end bundle lifecycle against SQLite and filesystem artifacts.

use bifrost_hooks::{hook_fn, DelayStrategy, HookSet, RetryPolicy};
use bifrost_release::{
    BifrostConfig, BundleService, FsArtifactStore, NoUpdate, ReleaseError, UploadedArtifacts,
};
use bifrost_store::{BundleStore, SqliteBundleStore};
use bifrost_types::{Bundle, BundleFilter, LifecycleEvent, NewBundle, Platform, Transition};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Harness {
    service: BundleService,
    store: Arc<SqliteBundleStore>,
    storage: TempDir,
}

async fn harness_with(hooks: HookSet, policy: RetryPolicy) -> Harness {
    let storage = tempfile::tempdir().unwrap();
    let mut config = BifrostConfig::development();
    config.environment_name = "test".to_string();
    config.storage_path = storage.path().to_path_buf();
    config.tags = vec!["prod".to_string(), "beta".to_string()];
    config.hooks = policy;

    let store = Arc::new(SqliteBundleStore::in_memory().await.unwrap());
    let artifacts = Arc::new(FsArtifactStore::new(storage.path()));
    let service = BundleService::new(Arc::new(config), store.clone(), artifacts, hooks);
    Harness {
        service,
        store,
        storage,
    }
}

async fn harness() -> Harness {
    harness_with(HookSet::new(), RetryPolicy::default()).await
}

async fn publish(h: &Harness, version: &str, tag: &str, files: UploadedArtifacts) -> Bundle {
    let bundle = h
        .service
        .reserve(NewBundle::new(version, tag), "alice")
        .await
        .unwrap();
    h.service.upload(&bundle.id, files).await.unwrap();
    bundle
}

fn fast_retries(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, DelayStrategy::Custom(|_| Duration::from_millis(1)))
}

#[tokio::test]
async fn resolver_distinguishes_every_no_update_reason() {
    let h = harness().await;

    let err = h
        .service
        .resolve("android", "2.0.0", "prod", None)
        .await
        .unwrap_err();
    assert_eq!(err.no_update(), Some(NoUpdate::NoRelease));

    let b1 = publish(&h, "2.0.0", "prod", UploadedArtifacts::new().android(b"apk".to_vec())).await;

    let err = h
        .service
        .resolve("ios", "2.0.0", "prod", None)
        .await
        .unwrap_err();
    assert_eq!(err.no_update(), Some(NoUpdate::ArtifactMissing(Platform::Ios)));
    assert!(err.is_not_found());

    let err = h
        .service
        .resolve("android", "2.0.0", "prod", Some(b1.id.as_str()))
        .await
        .unwrap_err();
    assert_eq!(err.no_update(), Some(NoUpdate::AlreadyCurrent));

    let update = h
        .service
        .resolve("android", "2.0.0", "prod", Some("old-id"))
        .await
        .unwrap();
    assert_eq!(update.bundle_id, b1.id);
    assert_eq!(
        update.download,
        format!("bundles/prod/2.0.0/{}/index.android.bundle.zip", b1.id)
    );
    assert!(h.storage.path().join(&update.download).is_file());
}

#[tokio::test]
async fn rollback_falls_back_to_previous_bundle() {
    let h = harness().await;
    let both = || UploadedArtifacts::new().android(b"apk".to_vec()).ios(b"ipa".to_vec());
    let b1 = publish(&h, "1.0.0", "prod", both()).await;
    let b2 = publish(&h, "1.1.0", "prod", both()).await;

    let rolled = h.service.rollback("prod").await.unwrap();
    assert_eq!(rolled.id, b2.id);
    assert!(rolled.is_disposed);

    assert!(h
        .store
        .get_by_version_tag(&b2.version, "prod")
        .await
        .unwrap()
        .is_none());
    assert!(h.store.get_by_id(&b2.id).await.unwrap().unwrap().is_disposed);

    let update = h
        .service
        .resolve("ios", &b1.version, "prod", None)
        .await
        .unwrap();
    assert_eq!(update.bundle_id, b1.id);

    let err = h.service.resolve("ios", &b2.version, "prod", None).await.unwrap_err();
    assert_eq!(err.no_update(), Some(NoUpdate::NoRelease));

    h.service.rollback("prod").await.unwrap();
    let err = h.service.rollback("prod").await.unwrap_err();
    assert!(matches!(err, ReleaseError::NotFound(_)));
}

#[tokio::test]
async fn dispose_and_recover_are_idempotent() {
    let h = harness().await;
    let bundle = publish(&h, "1.0.0", "prod", UploadedArtifacts::new().ios(b"ipa".to_vec())).await;

    assert_eq!(h.service.dispose(&bundle.id).await.unwrap(), Transition::Applied);
    assert_eq!(h.service.dispose(&bundle.id).await.unwrap(), Transition::Unchanged);
    assert!(h
        .store
        .get_by_version_tag("1.0.0", "prod")
        .await
        .unwrap()
        .is_none());
    assert!(h.service.get(&bundle.id).await.unwrap().is_disposed);

    assert_eq!(h.service.recover(&bundle.id).await.unwrap(), Transition::Applied);
    assert_eq!(h.service.recover(&bundle.id).await.unwrap(), Transition::Unchanged);
    assert!(!h.service.get(&bundle.id).await.unwrap().is_disposed);

    let update = h.service.resolve("ios", "1.0.0", "prod", None).await.unwrap();
    assert_eq!(update.bundle_id, bundle.id);
}

#[tokio::test]
async fn listing_is_newest_first_and_hides_disposed() {
    let h = harness().await;
    let mut ids = Vec::new();
    for version in ["1.0.0", "1.1.0", "1.2.0"] {
        let bundle = h
            .service
            .reserve(NewBundle::new(version, "prod"), "alice")
            .await
            .unwrap();
        ids.push(bundle.id);
    }
    h.service
        .reserve(NewBundle::new("9.9.9", "beta"), "bob")
        .await
        .unwrap();
    h.service.dispose(&ids[1]).await.unwrap();

    let active: Vec<_> = h
        .service
        .list("prod")
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(active, vec![ids[2].clone(), ids[0].clone()]);

    let all = h
        .service
        .list_filtered(&BundleFilter::new().tag("prod").include_disposed(true))
        .await
        .unwrap();
    assert_eq!(
        all.iter().map(|b| b.id.clone()).collect::<Vec<_>>(),
        vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]
    );
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    assert!(matches!(
        h.service.list("staging").await.unwrap_err(),
        ReleaseError::UnknownTag(_)
    ));
}

#[tokio::test]
async fn failing_hook_never_affects_the_transition() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let failing = hook_fn(move |bundle: Bundle, env: String| {
        let tx = tx.clone();
        async move {
            tx.send((bundle.id, env))?;
            anyhow::bail!("webhook unavailable")
        }
    });
    let hooks = HookSet::new().with(LifecycleEvent::Dispose, failing);
    let h = harness_with(hooks, fast_retries(5)).await;

    let bundle = h
        .service
        .reserve(NewBundle::new("1.0.0", "prod"), "alice")
        .await
        .unwrap();
    assert_eq!(h.service.dispose(&bundle.id).await.unwrap(), Transition::Applied);
    assert!(h.service.get(&bundle.id).await.unwrap().is_disposed);

    drop(h);
    let mut attempts = 0;
    while let Some((id, env)) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("hook task did not finish")
    {
        assert_eq!(id, bundle.id);
        assert_eq!(env, "test");
        attempts += 1;
    }
    assert_eq!(attempts, 6);
}

#[tokio::test]
async fn bundles_survive_reopening_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db/bifrost.sqlite");

    let id = {
        let store = SqliteBundleStore::open(&path).await.unwrap();
        let bundle = Bundle::create("1.0.0", "prod", "first", "alice");
        store.save(&bundle).await.unwrap();
        store.dispose(&bundle.id).await.unwrap();
        store.pool().close().await;
        bundle.id
    };

    let store = SqliteBundleStore::open(&path).await.unwrap();
    let bundle = store.get_by_id(&id).await.unwrap().unwrap();
    assert!(bundle.is_disposed);
    assert_eq!(bundle.note, "first");
    assert_eq!(store.recover(&id).await.unwrap(), Transition::Applied);
}
