//! End-to-end behavior of the repository facade: cache idempotence and
//! invalidation, retry bounds, read-side validation tolerance and write-side
//! validation blocking.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tracing_subscriber::layer::SubscriberExt;

use docvault::{FilterOp, QuerySpec, Repository, RetryPolicy, SortDirection};

use common::{
    gauge, gauge_fields, gauge_schema, CountingStore, DenyWrites, FailingStore, Gauge, WarnCounter,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, 5, 20)
}

#[tokio::test]
async fn test_get_all_hits_cache_on_second_read() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    let first = repo.get_all(true).await.unwrap();
    let second = repo.get_all(true).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(store.fetch_all_count(), 1);
}

#[tokio::test]
async fn test_get_all_bypasses_cache_on_request() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    repo.get_all(true).await.unwrap();
    repo.get_all(false).await.unwrap();

    assert_eq!(store.fetch_all_count(), 2);
}

#[tokio::test]
async fn test_expired_cache_entry_triggers_refetch() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> =
        Repository::with_ttl("gauges", store.clone(), Duration::from_millis(30));

    repo.get_all(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    repo.get_all(true).await.unwrap();

    assert_eq!(store.fetch_all_count(), 2);
}

#[tokio::test]
async fn test_create_invalidates_list_and_query_caches() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());
    let spec = QuerySpec::new().filter("low", FilterOp::Ge, json!(0));

    repo.get_all(true).await.unwrap();
    repo.query(&spec, true).await.unwrap();

    let id = repo.create(&gauge("boiler", 0, 100)).await.unwrap();
    assert!(!id.is_empty());

    let all = repo.get_all(true).await.unwrap();
    let queried = repo.query(&spec, true).await.unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(queried.len(), 1);
    assert_eq!(store.fetch_all_count(), 2);
    assert_eq!(store.query_count(), 2);
}

#[tokio::test]
async fn test_update_invalidates_item_and_list_caches() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    repo.get_by_id("g1", true).await.unwrap();
    repo.get_all(true).await.unwrap();

    repo.update("g1", json!({"high": 150})).await.unwrap();

    let updated = repo.get_by_id("g1", true).await.unwrap().unwrap();
    assert_eq!(updated.data.high, 150);

    let all = repo.get_all(true).await.unwrap();
    assert_eq!(all[0].data.high, 150);
    assert_eq!(store.fetch_all_count(), 2);
    assert_eq!(store.fetch_by_id_count(), 2);
}

#[tokio::test]
async fn test_delete_invalidates_caches() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    repo.get_by_id("g1", true).await.unwrap();
    repo.get_all(true).await.unwrap();

    repo.delete("g1").await.unwrap();

    assert!(repo.get_by_id("g1", true).await.unwrap().is_none());
    assert!(repo.get_all(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transient_failures_use_exactly_max_attempts() {
    let store = Arc::new(FailingStore::transient());
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_retry_policy(fast_retry());

    let err = repo.get_all(true).await.unwrap_err();
    assert_eq!(store.call_count(), 3);
    assert!(err.to_string().contains("gauges"));
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let store = Arc::new(FailingStore::permanent());
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_retry_policy(fast_retry());

    assert!(repo.get_all(true).await.is_err());
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn test_invalid_stored_documents_are_filtered_from_lists() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    store.inner.seed("gauges", "g2", gauge_fields("pump", 10, 90));
    store.inner.seed("gauges", "bad", json!({"name": "", "low": 5}));
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    let all = repo.get_all(true).await.unwrap();
    let mut names: Vec<&str> = all.iter().map(|r| r.data.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["boiler", "pump"]);
}

#[tokio::test]
async fn test_each_dropped_record_logs_one_warning() {
    let counter = WarnCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    store.inner.seed("gauges", "bad1", json!({"name": "", "low": 5}));
    store.inner.seed("gauges", "bad2", gauge_fields("pump", 9, 1));
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    let all = repo.get_all(true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(counter.warn_count(), 2);

    // a corrupt point lookup warns; a true absence stays silent
    assert!(repo.get_by_id("bad1", true).await.unwrap().is_none());
    assert_eq!(counter.warn_count(), 3);
    assert!(repo.get_by_id("missing", true).await.unwrap().is_none());
    assert_eq!(counter.warn_count(), 3);
}

#[tokio::test]
async fn test_corrupt_document_reads_as_absent() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "bad", json!({"name": "", "low": 5}));
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    assert!(repo.get_by_id("bad", true).await.unwrap().is_none());
    assert!(repo.get_by_id("missing", true).await.unwrap().is_none());
}

#[tokio::test]
async fn test_undeserializable_document_reads_as_absent() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "odd", json!({"name": 42}));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    assert!(repo.get_by_id("odd", true).await.unwrap().is_none());
    assert!(repo.get_all(true).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_validates_merged_document_before_writing() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 5, 10));
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    // raising low past the stored high must fail the cross-field check
    let err = repo.update("g1", json!({"low": 20})).await.unwrap_err();
    assert!(err
        .validation_errors()
        .unwrap()
        .iter()
        .any(|e| e.contains("must be >= low")));
    assert_eq!(store.patch_count(), 0);

    // raising high keeps the merged document valid
    repo.update("g1", json!({"high": 25})).await.unwrap();
    assert_eq!(store.patch_count(), 1);

    let current = repo.get_by_id("g1", false).await.unwrap().unwrap();
    assert_eq!(current.data.high, 25);
    assert_eq!(current.data.low, 5);
}

#[tokio::test]
async fn test_update_missing_document_fails_without_writing() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    let err = repo.update("ghost", json!({"high": 25})).await.unwrap_err();
    assert!(err.validation_errors().is_none());
    assert!(err.to_string().contains("ghost"));
    assert_eq!(store.patch_count(), 0);
}

#[tokio::test]
async fn test_update_without_schema_skips_read_back() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    repo.update("g1", json!({"high": 150})).await.unwrap();

    assert_eq!(store.fetch_by_id_count(), 0);
    assert_eq!(store.patch_count(), 1);
}

#[tokio::test]
async fn test_update_rejects_non_object_partial() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    let err = repo.update("g1", json!([1, 2])).await.unwrap_err();
    assert!(err.validation_errors().is_some());
    assert_eq!(store.patch_count(), 0);
}

#[tokio::test]
async fn test_create_validation_failure_makes_no_network_call() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> =
        Repository::new("gauges", store.clone()).with_schema(gauge_schema());

    let err = repo.create(&gauge("", 0, 100)).await.unwrap_err();
    let violations = err.validation_errors().unwrap();
    assert!(violations.iter().any(|e| e.starts_with("name:")));
    assert_eq!(store.insert_count(), 0);
}

#[tokio::test]
async fn test_access_policy_blocks_writes_before_network() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone())
        .with_access_policy(Arc::new(DenyWrites));

    // reads pass through
    assert_eq!(repo.get_all(true).await.unwrap().len(), 1);

    let err = repo.create(&gauge("pump", 0, 50)).await.unwrap_err();
    assert!(err.to_string().contains("permission denied"));
    assert_eq!(store.insert_count(), 0);

    assert!(repo.update("g1", json!({"high": 1})).await.is_err());
    assert!(repo.delete("g1").await.is_err());
    assert_eq!(store.patch_count(), 0);
    assert_eq!(store.remove_count(), 0);
}

#[tokio::test]
async fn test_equivalent_query_specs_share_one_cache_slot() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    let a = QuerySpec::new()
        .filter("low", FilterOp::Ge, json!(0))
        .filter("name", FilterOp::Eq, json!("boiler"));
    let b = QuerySpec::new()
        .filter("name", FilterOp::Eq, json!("boiler"))
        .filter("low", FilterOp::Ge, json!(0));

    repo.query(&a, true).await.unwrap();
    repo.query(&b, true).await.unwrap();
    assert_eq!(store.query_count(), 1);

    // a different limit is a different slot
    repo.query(&a.clone().limit(5), true).await.unwrap();
    assert_eq!(store.query_count(), 2);
}

#[tokio::test]
async fn test_query_applies_filters_order_and_limit() {
    let store = Arc::new(CountingStore::new());
    store.inner.seed("gauges", "g1", gauge_fields("boiler", 0, 100));
    store.inner.seed("gauges", "g2", gauge_fields("pump", 10, 90));
    store.inner.seed("gauges", "g3", gauge_fields("valve", 20, 80));
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    let spec = QuerySpec::new()
        .filter("low", FilterOp::Ge, json!(10))
        .order_by("low", SortDirection::Desc)
        .limit(1);

    let results = repo.query(&spec, true).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data.name, "valve");
}

#[tokio::test]
async fn test_clear_cache_forces_refetch() {
    let store = Arc::new(CountingStore::new());
    let repo: Repository<Gauge> = Repository::new("gauges", store.clone());

    repo.get_all(true).await.unwrap();
    repo.clear_cache();
    repo.get_all(true).await.unwrap();

    assert_eq!(store.fetch_all_count(), 2);
}
