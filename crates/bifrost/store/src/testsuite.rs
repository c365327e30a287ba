//! Behaviour every `BundleStore` implementation must share.

use crate::{BundleStore, StoreError};
use bifrost_types::{Bundle, BundleFilter, BundleId, BundleUpdate, Transition};
use chrono::{Duration, TimeZone, Utc};
use std::future::Future;

pub(crate) fn bundle_at(version: &str, tag: &str, author: &str, minute: i64) -> Bundle {
    let mut bundle = Bundle::create(version, tag, format!("note {minute}"), author);
    bundle.created_at =
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
    bundle
}

pub(crate) async fn run_all<S, F, Fut>(make: F)
where
    S: BundleStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    save_and_get(&make().await).await;
    duplicate_id_conflicts(&make().await).await;
    version_tag_lookup_skips_disposed(&make().await).await;
    list_filters_and_ordering(&make().await).await;
    list_pagination(&make().await).await;
    update_note(&make().await).await;
    disposal_transitions(&make().await).await;
    disposal_returns_stored_record(&make().await).await;
    latest_active_for_tag(&make().await).await;
}

async fn save_and_get<S: BundleStore>(store: &S) {
    let bundle = Bundle::create("1.0.0", "prod", "initial", "alice");
    store.save(&bundle).await.unwrap();

    let loaded = store.get_by_id(&bundle.id).await.unwrap();
    assert_eq!(loaded, Some(bundle));

    let missing = store.get_by_id(&BundleId::new("nope")).await.unwrap();
    assert!(missing.is_none());
}

async fn duplicate_id_conflicts<S: BundleStore>(store: &S) {
    let bundle = Bundle::create("1.0.0", "prod", "", "alice");
    store.save(&bundle).await.unwrap();
    let err = store.save(&bundle).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)), "got {err:?}");
}

async fn version_tag_lookup_skips_disposed<S: BundleStore>(store: &S) {
    let older = bundle_at("1.0.0", "prod", "alice", 0);
    let newer = bundle_at("1.0.0", "prod", "alice", 5);
    let other_tag = bundle_at("1.0.0", "staging", "alice", 10);
    for b in [&older, &newer, &other_tag] {
        store.save(b).await.unwrap();
    }

    let found = store.get_by_version_tag("1.0.0", "prod").await.unwrap();
    assert_eq!(found.map(|b| b.id), Some(newer.id.clone()));

    store.dispose(&newer.id).await.unwrap();
    let found = store.get_by_version_tag("1.0.0", "prod").await.unwrap();
    assert_eq!(found.map(|b| b.id), Some(older.id.clone()));

    store.dispose(&older.id).await.unwrap();
    assert!(store
        .get_by_version_tag("1.0.0", "prod")
        .await
        .unwrap()
        .is_none());
    // Disposed records persist.
    let kept = store.get_by_id(&older.id).await.unwrap().unwrap();
    assert!(kept.is_disposed);

    assert!(store
        .get_by_version_tag("2.0.0", "prod")
        .await
        .unwrap()
        .is_none());
}

async fn list_filters_and_ordering<S: BundleStore>(store: &S) {
    let a = bundle_at("1.0.0", "prod", "alice", 1);
    let b = bundle_at("1.1.0", "prod", "bob", 3);
    let c = bundle_at("1.2.0", "prod", "alice", 2);
    let d = bundle_at("1.0.0", "staging", "alice", 4);
    for bundle in [&a, &b, &c, &d] {
        store.save(bundle).await.unwrap();
    }
    store.dispose(&b.id).await.unwrap();

    let ids = |bundles: Vec<Bundle>| bundles.into_iter().map(|b| b.id).collect::<Vec<_>>();

    let prod = store.list(&BundleFilter::new().tag("prod")).await.unwrap();
    assert_eq!(ids(prod), vec![c.id.clone(), a.id.clone()]);

    let prod_all = store
        .list(&BundleFilter::new().tag("prod").include_disposed(true))
        .await
        .unwrap();
    assert_eq!(
        ids(prod_all),
        vec![b.id.clone(), c.id.clone(), a.id.clone()]
    );

    let by_alice = store
        .list(&BundleFilter::new().author("alice"))
        .await
        .unwrap();
    assert_eq!(
        ids(by_alice),
        vec![d.id.clone(), c.id.clone(), a.id.clone()]
    );

    let v100 = store
        .list(&BundleFilter::new().version("1.0.0"))
        .await
        .unwrap();
    assert_eq!(ids(v100), vec![d.id.clone(), a.id.clone()]);

    let everything = store
        .list(&BundleFilter::new().include_disposed(true))
        .await
        .unwrap();
    assert_eq!(everything.len(), 4);
    assert!(everything
        .windows(2)
        .all(|pair| pair[0].created_at > pair[1].created_at));
}

async fn list_pagination<S: BundleStore>(store: &S) {
    let bundles = (0..5)
        .map(|minute| bundle_at("1.0.0", "prod", "alice", minute))
        .collect::<Vec<_>>();
    for bundle in &bundles {
        store.save(bundle).await.unwrap();
    }

    let page = store
        .list(&BundleFilter::new().limit(2).offset(1))
        .await
        .unwrap();
    let page_ids = page.into_iter().map(|b| b.id).collect::<Vec<_>>();
    assert_eq!(page_ids, vec![bundles[3].id.clone(), bundles[2].id.clone()]);

    let tail = store.list(&BundleFilter::new().offset(3)).await.unwrap();
    let tail_ids = tail.into_iter().map(|b| b.id).collect::<Vec<_>>();
    assert_eq!(tail_ids, vec![bundles[1].id.clone(), bundles[0].id.clone()]);

    let none = store.list(&BundleFilter::new().limit(0)).await.unwrap();
    assert!(none.is_empty());
}

async fn update_note<S: BundleStore>(store: &S) {
    let bundle = Bundle::create("1.0.0", "prod", "before", "alice");
    store.save(&bundle).await.unwrap();

    let updated = store
        .update(&bundle.id, &BundleUpdate::note("after"))
        .await
        .unwrap();
    assert_eq!(updated.note, "after");
    assert_eq!(updated.created_at, bundle.created_at);
    assert_eq!(
        store.get_by_id(&bundle.id).await.unwrap().unwrap().note,
        "after"
    );

    let err = store
        .update(&bundle.id, &BundleUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NoChanges(_)), "got {err:?}");

    let err = store
        .update(&BundleId::new("missing"), &BundleUpdate::note("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

async fn disposal_transitions<S: BundleStore>(store: &S) {
    let bundle = Bundle::create("1.0.0", "prod", "", "alice");
    store.save(&bundle).await.unwrap();

    assert_eq!(store.recover(&bundle.id).await.unwrap(), Transition::Unchanged);
    assert_eq!(store.dispose(&bundle.id).await.unwrap(), Transition::Applied);
    assert_eq!(store.dispose(&bundle.id).await.unwrap(), Transition::Unchanged);
    assert!(store.get_by_id(&bundle.id).await.unwrap().unwrap().is_disposed);
    assert_eq!(store.recover(&bundle.id).await.unwrap(), Transition::Applied);
    assert!(!store.get_by_id(&bundle.id).await.unwrap().unwrap().is_disposed);

    let err = store.dispose(&BundleId::new("missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got {err:?}");
}

async fn disposal_returns_stored_record<S: BundleStore>(store: &S) {
    let bundle = bundle_at("1.0.0", "prod", "alice", 0);
    store.save(&bundle).await.unwrap();

    let (transition, stored) = store.set_disposed(&bundle.id, true).await.unwrap();
    assert_eq!(transition, Transition::Applied);
    assert_eq!(
        stored,
        Bundle {
            is_disposed: true,
            ..bundle.clone()
        }
    );

    let (transition, stored) = store.set_disposed(&bundle.id, true).await.unwrap();
    assert_eq!(transition, Transition::Unchanged);
    assert!(stored.is_disposed);

    let (transition, stored) = store.set_disposed(&bundle.id, false).await.unwrap();
    assert_eq!(transition, Transition::Applied);
    assert_eq!(stored, bundle);
}

async fn latest_active_for_tag<S: BundleStore>(store: &S) {
    assert!(store.latest_active_for_tag("prod").await.unwrap().is_none());

    let b1 = bundle_at("1.0.0", "prod", "alice", 0);
    let b2 = bundle_at("2.0.0", "prod", "alice", 1);
    store.save(&b1).await.unwrap();
    store.save(&b2).await.unwrap();

    let latest = store.latest_active_for_tag("prod").await.unwrap();
    assert_eq!(latest.map(|b| b.id), Some(b2.id.clone()));

    store.dispose(&b2.id).await.unwrap();
    let latest = store.latest_active_for_tag("prod").await.unwrap();
    assert_eq!(latest.map(|b| b.id), Some(b1.id));
}
