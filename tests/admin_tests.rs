//! Administration workflows: the confirmation-token state machine, bulk
//! invalidation shapes, and import/export.

mod common;

use serde_json::json;

use aprova_cache::admin::{
    CacheAdministration, ExportQuery, ImportOptions, InvalidationRequest,
};
use aprova_cache::error::CacheError;
use aprova_cache::manager::CacheOptions;
use aprova_cache::models::CacheType;

#[tokio::test]
async fn small_named_key_sets_execute_without_confirmation() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Memory);

    manager.set("a", json!(1), &options).await;
    manager.set("b", json!(2), &options).await;

    let response = admin
        .request_invalidation(
            &InvalidationRequest::keys(vec!["a".to_string(), "b".to_string()])
                .with_cache_type(CacheType::Memory),
        )
        .await
        .unwrap();

    let results = response.results().expect("should execute directly");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(manager.get("a", &options).await, None);
    assert_eq!(manager.get("b", &options).await, None);
}

#[tokio::test]
async fn more_than_five_keys_require_confirmation() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Memory);

    let keys: Vec<String> = (0..6).map(|i| format!("key_{i}")).collect();
    for key in &keys {
        manager.set(key, json!(1), &options).await;
    }

    let request =
        InvalidationRequest::keys(keys.clone()).with_cache_type(CacheType::Memory);
    let response = admin.request_invalidation(&request).await.unwrap();
    let token = response
        .confirmation_token()
        .expect("six keys must require confirmation");

    // Nothing was removed while awaiting confirmation.
    for key in &keys {
        assert!(manager.get(key, &options).await.is_some());
    }

    let confirmed = admin
        .request_invalidation(&request.clone().with_token(token).with_reason("cleanup"))
        .await
        .unwrap();
    assert_eq!(confirmed.results().unwrap().len(), 6);
    for key in &keys {
        assert!(manager.get(key, &options).await.is_none());
    }
}

#[tokio::test]
async fn clear_by_type_runs_the_full_confirmation_state_machine() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let memory = CacheOptions::tier(CacheType::Memory);
    let local = CacheOptions::tier(CacheType::LocalStorage);

    manager.set("mem_a", json!(1), &memory).await;
    manager.set("mem_b", json!(2), &memory).await;
    manager.set("local_a", json!(3), &local).await;

    let request = InvalidationRequest::clear_type(CacheType::Memory);

    // Requesting without a token yields the distinct confirmation status
    // and removes nothing.
    let response = admin.request_invalidation(&request).await.unwrap();
    let token = response.confirmation_token().unwrap().to_string();
    assert!(manager.get("mem_a", &memory).await.is_some());

    // Resubmitting with the token clears the tier.
    let confirmed = admin
        .request_invalidation(&request.clone().with_token(token.as_str()))
        .await
        .unwrap();
    assert_eq!(confirmed.results().unwrap().len(), 2);
    assert!(manager.get("mem_a", &memory).await.is_none());
    assert!(manager.get("mem_b", &memory).await.is_none());
    // Other tiers are untouched.
    assert!(manager.get("local_a", &local).await.is_some());

    // Reusing the consumed token is rejected.
    let reused = admin
        .request_invalidation(&request.with_token(token.as_str()))
        .await;
    assert!(matches!(reused, Err(CacheError::ConfirmationInvalid(_))));
}

#[tokio::test]
async fn token_minted_for_one_operation_is_rejected_for_another() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());

    manager
        .set("mem_a", json!(1), &CacheOptions::tier(CacheType::Memory))
        .await;

    let token = admin
        .request_invalidation(&InvalidationRequest::clear_type(CacheType::Memory))
        .await
        .unwrap()
        .confirmation_token()
        .unwrap()
        .to_string();

    let other = admin
        .request_invalidation(
            &InvalidationRequest::clear_type(CacheType::LocalStorage).with_token(token.as_str()),
        )
        .await;
    assert!(matches!(other, Err(CacheError::ConfirmationInvalid(_))));

    // The original operation still accepts its token afterwards.
    let original = admin
        .request_invalidation(
            &InvalidationRequest::clear_type(CacheType::Memory).with_token(token.as_str()),
        )
        .await
        .unwrap();
    assert!(original.results().is_some());
}

#[tokio::test]
async fn clear_by_pattern_matches_keys_across_tiers() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let memory = CacheOptions::tier(CacheType::Memory);
    let local = CacheOptions::tier(CacheType::LocalStorage);

    manager.set("performance_u1_simulados", json!(1), &memory).await;
    manager.set("performance_u1_questoes", json!(2), &local).await;
    manager.set("discipline_stats_u1_7", json!(3), &memory).await;

    let request = InvalidationRequest::pattern("^performance_u1");
    let token = admin
        .request_invalidation(&request)
        .await
        .unwrap()
        .confirmation_token()
        .unwrap()
        .to_string();

    let confirmed = admin
        .request_invalidation(&request.with_token(token))
        .await
        .unwrap();

    assert_eq!(confirmed.results().unwrap().len(), 2);
    assert!(manager.get("performance_u1_simulados", &memory).await.is_none());
    assert!(manager.get("performance_u1_questoes", &local).await.is_none());
    assert!(manager.get("discipline_stats_u1_7", &memory).await.is_some());
}

#[tokio::test]
async fn malformed_requests_are_rejected_before_any_side_effect() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());

    let empty_keys = admin
        .request_invalidation(&InvalidationRequest::keys(vec![]))
        .await;
    assert!(matches!(
        empty_keys,
        Err(CacheError::Validation { ref field, .. }) if field == "keys"
    ));

    let bad_pattern = admin
        .request_invalidation(&InvalidationRequest::pattern("(unclosed"))
        .await;
    assert!(matches!(
        bad_pattern,
        Err(CacheError::Validation { ref field, .. }) if field == "pattern"
    ));

    let persisted_without_owner = admin
        .request_invalidation(&InvalidationRequest::clear_type(CacheType::Persisted))
        .await;
    assert!(matches!(
        persisted_without_owner,
        Err(CacheError::Validation { ref field, .. }) if field == "owner"
    ));
}

#[tokio::test]
async fn cascade_invalidation_follows_related_keys() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Memory);

    manager
        .set(
            "a",
            json!(1),
            &options.clone().with_related_keys(vec!["b".to_string()]),
        )
        .await;
    manager.set("b", json!(2), &options).await;

    let response = admin
        .request_invalidation(
            &InvalidationRequest::keys(vec!["a".to_string()])
                .with_cache_type(CacheType::Memory)
                .with_cascade(),
        )
        .await
        .unwrap();

    let results = response.results().unwrap();
    assert_eq!(results.len(), 2);
    assert!(manager.get("a", &options).await.is_none());
    assert!(manager.get("b", &options).await.is_none());
}

#[tokio::test]
async fn export_import_round_trips_entries() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let memory = CacheOptions::tier(CacheType::Memory);
    let local = CacheOptions::tier(CacheType::LocalStorage);

    manager
        .set(
            "performance_u1_simulados",
            json!({"total": 3}),
            &memory
                .clone()
                .with_related_keys(vec!["discipline_stats_u1_7".to_string()]),
        )
        .await;
    manager
        .set("discipline_stats_u1_7", json!({"accuracy": 0.7}), &local)
        .await;

    let bundle = admin.export_entries(&ExportQuery::default()).await.unwrap();
    assert_eq!(bundle.version, "1.0");
    assert_eq!(bundle.entries.len(), 2);

    // Import into a fresh process.
    let fresh_manager = common::manager();
    let fresh_admin = CacheAdministration::new(fresh_manager.clone());
    let value = serde_json::to_value(&bundle).unwrap();
    let results = fresh_admin
        .import_entries(&value, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));
    assert_eq!(
        fresh_manager.get("performance_u1_simulados", &memory).await,
        Some(json!({"total": 3}))
    );
    assert_eq!(
        fresh_manager.get("discipline_stats_u1_7", &local).await,
        Some(json!({"accuracy": 0.7}))
    );

    // Related keys travel with the bundle and repopulate the index.
    let invalidated = fresh_manager
        .invalidate_with_related("performance_u1_simulados", &CacheOptions::probe())
        .await;
    assert_eq!(invalidated.len(), 2);
}

#[tokio::test]
async fn malformed_bundles_fail_fast_before_any_write() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());

    let missing_entries = json!({"version": "1.0", "exportDate": "2024-06-01T12:00:00Z"});
    let err = admin
        .import_entries(&missing_entries, &ImportOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CacheError::Validation { ref field, .. } if field == "entries"
    ));

    let inspector = aprova_cache::inspector::CacheInspector::new(manager);
    let keys = inspector
        .get_keys(&aprova_cache::inspector::KeyFilter::default())
        .await
        .unwrap();
    assert!(keys.is_empty(), "no entry may be written on a failed import");
}

#[tokio::test]
async fn import_reports_per_key_failures_without_aborting() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());

    let bundle = json!({
        "version": "1.0",
        "exportDate": "2024-06-01T12:00:00Z",
        "entries": [
            {
                "key": "good",
                "cacheType": "memory",
                "data": {"v": 1},
                "createdAt": "2024-06-01T11:00:00Z",
                "expiresAt": "2099-01-01T00:00:00Z",
                "relatedKeys": []
            },
            {
                "key": "needs_owner",
                "cacheType": "persisted",
                "data": {"v": 2},
                "createdAt": "2024-06-01T11:00:00Z",
                "expiresAt": "2099-01-01T00:00:00Z",
                "relatedKeys": []
            },
            {
                "key": "long_gone",
                "cacheType": "memory",
                "data": {"v": 3},
                "createdAt": "2020-01-01T00:00:00Z",
                "expiresAt": "2020-01-02T00:00:00Z",
                "relatedKeys": []
            }
        ]
    });

    let results = admin
        .import_entries(&bundle, &ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let good = results.iter().find(|r| r.key == "good").unwrap();
    assert!(good.success);
    let needs_owner = results.iter().find(|r| r.key == "needs_owner").unwrap();
    assert!(!needs_owner.success);
    assert!(needs_owner.error.as_ref().unwrap().contains("owner"));
    let long_gone = results.iter().find(|r| r.key == "long_gone").unwrap();
    assert!(!long_gone.success);
    assert!(long_gone.error.as_ref().unwrap().contains("expired"));

    assert_eq!(
        manager
            .get("good", &CacheOptions::tier(CacheType::Memory))
            .await,
        Some(json!({"v": 1}))
    );
}

#[tokio::test]
async fn import_respects_overwrite_configuration() {
    let manager = common::manager();
    let admin = CacheAdministration::new(manager.clone());
    let options = CacheOptions::tier(CacheType::Memory);

    manager.set("k", json!("original"), &options).await;

    let bundle = json!({
        "version": "1.0",
        "exportDate": "2024-06-01T12:00:00Z",
        "entries": [{
            "key": "k",
            "cacheType": "memory",
            "data": "imported",
            "createdAt": "2024-06-01T11:00:00Z",
            "expiresAt": "2099-01-01T00:00:00Z",
            "relatedKeys": []
        }]
    });

    let keep = ImportOptions {
        overwrite_existing: false,
        owner: None,
    };
    let results = admin.import_entries(&bundle, &keep).await.unwrap();
    assert!(!results[0].success);
    assert_eq!(manager.get("k", &options).await, Some(json!("original")));

    let overwrite = ImportOptions::default();
    let results = admin.import_entries(&bundle, &overwrite).await.unwrap();
    assert!(results[0].success);
    assert_eq!(manager.get("k", &options).await, Some(json!("imported")));
}
