//! Inspector behavior: key enumeration with filters, entry metadata, and
//! paginated entry listings.

mod common;

use chrono::{Duration, Utc};
use serde_json::json;

use aprova_cache::error::CacheError;
use aprova_cache::inspector::{CacheInspector, EntryQuery, KeyFilter};
use aprova_cache::manager::CacheOptions;
use aprova_cache::models::CacheType;
use aprova_cache::query_builder::Pagination;

#[tokio::test]
async fn get_keys_aggregates_across_tiers_without_a_type() {
    let manager = common::manager();
    let inspector = CacheInspector::new(manager.clone());

    manager
        .set("mem_key", json!(1), &CacheOptions::tier(CacheType::Memory))
        .await;
    manager
        .set("local_key", json!(2), &CacheOptions::tier(CacheType::LocalStorage))
        .await;
    manager
        .set(
            "session_key",
            json!(3),
            &CacheOptions::tier(CacheType::SessionStorage),
        )
        .await;

    let keys = inspector.get_keys(&KeyFilter::default()).await.unwrap();
    assert_eq!(keys, vec!["local_key", "mem_key", "session_key"]);
}

#[tokio::test]
async fn get_keys_reaches_persisted_only_with_an_owner() {
    let (manager, backend) = common::manager_with_backend();
    let inspector = CacheInspector::new(manager);

    backend.seed_row(
        "u1",
        "persisted_key",
        json!(1),
        Utc::now() + Duration::minutes(30),
        None,
    );

    let without_owner = inspector.get_keys(&KeyFilter::default()).await.unwrap();
    assert!(without_owner.is_empty());

    let with_owner = inspector
        .get_keys(&KeyFilter {
            owner: Some("u1".to_string()),
            ..KeyFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(with_owner, vec!["persisted_key"]);
}

#[tokio::test]
async fn get_keys_filters_by_pattern() {
    let manager = common::manager();
    let inspector = CacheInspector::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Memory);

    manager.set("performance_u1_simulados", json!(1), &options).await;
    manager.set("performance_u2_questoes", json!(2), &options).await;
    manager.set("discipline_stats_u1_7", json!(3), &options).await;

    let keys = inspector
        .get_keys(&KeyFilter {
            pattern: Some("^performance_u1".to_string()),
            ..KeyFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(keys, vec!["performance_u1_simulados"]);
}

#[tokio::test]
async fn invalid_pattern_is_a_field_level_validation_error() {
    let inspector = CacheInspector::new(common::manager());

    let err = inspector
        .get_keys(&KeyFilter {
            pattern: Some("(unclosed".to_string()),
            ..KeyFilter::default()
        })
        .await
        .unwrap_err();

    match err {
        CacheError::Validation { field, .. } => assert_eq!(field, "pattern"),
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn expired_keys_are_hidden_unless_requested() {
    let (manager, backend) = common::manager_with_backend();
    let inspector = CacheInspector::new(manager);

    backend.seed_row(
        "u1",
        "stale",
        json!(1),
        Utc::now() - Duration::minutes(5),
        None,
    );
    backend.seed_row(
        "u1",
        "fresh",
        json!(2),
        Utc::now() + Duration::minutes(30),
        None,
    );

    let filter = KeyFilter {
        cache_type: Some(CacheType::Persisted),
        owner: Some("u1".to_string()),
        ..KeyFilter::default()
    };
    assert_eq!(inspector.get_keys(&filter).await.unwrap(), vec!["fresh"]);

    let with_expired = KeyFilter {
        include_expired: true,
        ..filter
    };
    assert_eq!(
        inspector.get_keys(&with_expired).await.unwrap(),
        vec!["fresh", "stale"]
    );
}

#[tokio::test]
async fn metadata_reports_size_and_related_keys() {
    let manager = common::manager();
    let inspector = CacheInspector::new(manager.clone());

    manager
        .set(
            "k",
            json!({"total": 3}),
            &CacheOptions::tier(CacheType::Memory)
                .with_related_keys(vec!["other".to_string()]),
        )
        .await;

    let metadata = inspector
        .get_entry_metadata("k", CacheType::Memory, None)
        .await
        .unwrap();

    assert_eq!(metadata.cache_type, CacheType::Memory);
    assert!(!metadata.expired);
    assert_eq!(metadata.size_bytes, r#"{"total":3}"#.len());
    assert_eq!(metadata.related_keys, vec!["other"]);
    assert!(metadata.expires_at > metadata.created_at);
}

#[tokio::test]
async fn web_storage_metadata_measures_the_stored_text() {
    let manager = common::manager();
    let inspector = CacheInspector::new(manager.clone());

    manager
        .set("k", json!("abc"), &CacheOptions::tier(CacheType::LocalStorage))
        .await;

    let metadata = inspector
        .get_entry_metadata("k", CacheType::LocalStorage, None)
        .await
        .unwrap();

    // The stored record wraps the payload in its envelope, so the measured
    // size exceeds the bare payload.
    assert!(metadata.size_bytes > "\"abc\"".len());
}

#[tokio::test]
async fn pagination_windows_keys_before_any_data_fetch() {
    let (manager, backend) = common::manager_with_backend();
    let inspector = CacheInspector::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Persisted).with_owner("u1");

    for i in 0..5 {
        manager.set(&format!("key_{i}"), json!(i), &options).await;
    }

    let before = backend.fetch_calls();
    let entries = inspector
        .get_all_entries(&EntryQuery {
            cache_type: Some(CacheType::Persisted),
            owner: Some("u1".to_string()),
            include_data: true,
            pagination: Some(Pagination::limit_offset(2, 1)),
            ..EntryQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, "key_1");
    assert_eq!(entries[1].key, "key_2");
    assert_eq!(entries[0].data, Some(json!(1)));
    // Only the two windowed rows paid a fetch; the skipped rows did not.
    assert_eq!(backend.fetch_calls() - before, 2);
}

#[tokio::test]
async fn entry_listing_omits_data_unless_requested() {
    let manager = common::manager();
    let inspector = CacheInspector::new(manager.clone());

    manager
        .set("k", json!({"big": "payload"}), &CacheOptions::tier(CacheType::Memory))
        .await;

    let entries = inspector
        .get_all_entries(&EntryQuery {
            cache_type: Some(CacheType::Memory),
            include_data: false,
            ..EntryQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert!(entries[0].data.is_none());
    assert!(entries[0].size_bytes > 0);
}
