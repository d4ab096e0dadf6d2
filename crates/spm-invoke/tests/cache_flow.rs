use std::time::Duration;

use futures_util::future::join_all;
use serde_json::json;

use spm_invoke::test_support::RecordingGateway;
use spm_invoke::RequestCache;

const NO_CACHE: Duration = Duration::ZERO;
const FIVE_SECS: Duration = Duration::from_secs(5);

#[tokio::test]
async fn returns_backend_result_and_records_the_call() {
    let cache = RequestCache::new(RecordingGateway::new());
    let result = cache
        .fetch("get_plan", Some(json!({"id": 7})), NO_CACHE)
        .await
        .unwrap();

    assert_eq!(result, json!({"command": "get_plan", "args": {"id": 7}}));
    let invocations = cache.gateway().invocations();
    assert_eq!(invocations.len(), 1);
    assert_eq!(invocations[0].0, "get_plan");
    assert_eq!(invocations[0].1, Some(json!({"id": 7})));
}

#[tokio::test]
async fn concurrent_identical_fetches_share_one_call() {
    let cache = RequestCache::new(RecordingGateway::with_latency(Duration::from_millis(50)));

    let fetches = (0..5).map(|_| cache.fetch("get_plans", Some(json!({"filter": null})), NO_CACHE));
    let results = join_all(fetches).await;

    assert_eq!(cache.gateway().calls(), 1);
    let first = results[0].as_ref().unwrap();
    for result in &results {
        assert_eq!(result.as_ref().unwrap(), first);
    }
    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.coalesced, 4);
}

#[tokio::test]
async fn coalesced_callers_all_observe_the_same_failure() {
    let gateway = RecordingGateway::with_latency(Duration::from_millis(30));
    gateway.push_err("db is locked");
    let cache = RequestCache::new(gateway);

    let fetches = (0..3).map(|_| cache.fetch("get_risk_analysis", Some(json!({"planId": 1})), FIVE_SECS));
    let results = join_all(fetches).await;

    assert_eq!(cache.gateway().calls(), 1);
    for result in &results {
        let err = result.as_ref().unwrap_err();
        assert_eq!(err.command, "get_risk_analysis");
        assert_eq!(err.message, "db is locked");
    }
}

#[tokio::test]
async fn fresh_entries_are_served_without_a_second_call() {
    let gateway = RecordingGateway::new();
    gateway.push_ok(json!({"id": 1, "name": "march plan"}));
    let cache = RequestCache::new(gateway);

    let first = cache
        .fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS)
        .await
        .unwrap();
    let second = cache
        .fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS)
        .await
        .unwrap();

    assert_eq!(cache.gateway().calls(), 1);
    assert_eq!(first, second);
    assert_eq!(cache.stats().hits, 1);
}

#[tokio::test]
async fn expired_entries_trigger_a_refetch() {
    let gateway = RecordingGateway::new();
    gateway.push_ok(json!({"version": 1}));
    gateway.push_ok(json!({"version": 2}));
    let cache = RequestCache::new(gateway);
    let ttl = Duration::from_millis(30);

    let first = cache.fetch("get_plan", Some(json!({"id": 1})), ttl).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let second = cache.fetch("get_plan", Some(json!({"id": 1})), ttl).await.unwrap();

    assert_eq!(cache.gateway().calls(), 2);
    assert_eq!(first, json!({"version": 1}));
    assert_eq!(second, json!({"version": 2}));
}

#[tokio::test]
async fn distinct_args_are_tracked_independently() {
    let cache = RequestCache::new(RecordingGateway::new());

    cache.fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    cache.fetch("get_plan", Some(json!({"id": 2})), FIVE_SECS).await.unwrap();

    assert_eq!(cache.gateway().calls(), 2);
    assert_eq!(cache.stats().entries, 2);
}

#[tokio::test]
async fn permuted_argument_maps_share_one_entry() {
    let cache = RequestCache::new(RecordingGateway::new());

    cache
        .fetch("get_plans", Some(json!({"status": "draft", "period_type": "weekly"})), FIVE_SECS)
        .await
        .unwrap();
    cache
        .fetch("get_plans", Some(json!({"period_type": "weekly", "status": "draft"})), FIVE_SECS)
        .await
        .unwrap();

    assert_eq!(cache.gateway().calls(), 1);
}

#[tokio::test]
async fn zero_ttl_never_caches() {
    let gateway = RecordingGateway::new();
    gateway.push_ok(json!({"seq": 1}));
    gateway.push_ok(json!({"seq": 2}));
    let cache = RequestCache::new(gateway);

    let first = cache.fetch("get_schedule_items", Some(json!({"planId": 3})), NO_CACHE).await.unwrap();
    let second = cache.fetch("get_schedule_items", Some(json!({"planId": 3})), NO_CACHE).await.unwrap();

    assert_eq!(cache.gateway().calls(), 2);
    assert_ne!(first, second);
}

#[tokio::test]
async fn failures_are_never_cached() {
    let gateway = RecordingGateway::new();
    gateway.push_err("transient");
    let cache = RequestCache::new(gateway);

    let first = cache.fetch("get_material_stats", None, FIVE_SECS).await;
    assert!(first.is_err());
    assert_eq!(cache.stats().entries, 0);

    let second = cache.fetch("get_material_stats", None, FIVE_SECS).await;
    assert!(second.is_ok());
    assert_eq!(cache.gateway().calls(), 2);
}

#[tokio::test]
async fn prefix_invalidation_only_hits_matching_commands() {
    let cache = RequestCache::new(RecordingGateway::new());

    cache.fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    cache.fetch("get_material", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    assert_eq!(cache.gateway().calls(), 2);

    cache.invalidate(Some("get_plan"));

    cache.fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    assert_eq!(cache.gateway().calls(), 3);

    cache.fetch("get_material", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    assert_eq!(cache.gateway().calls(), 3);
}

#[tokio::test]
async fn full_invalidation_clears_every_entry() {
    let cache = RequestCache::new(RecordingGateway::new());

    cache.fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    cache.fetch("get_backups", None, FIVE_SECS).await.unwrap();

    cache.invalidate(None);
    assert_eq!(cache.stats().entries, 0);

    cache.fetch("get_plan", Some(json!({"id": 1})), FIVE_SECS).await.unwrap();
    assert_eq!(cache.gateway().calls(), 3);
}

#[tokio::test]
async fn invalidation_on_an_empty_cache_is_a_no_op() {
    let cache = RequestCache::new(RecordingGateway::new());
    cache.invalidate(None);
    cache.invalidate(Some("get_plan"));
    assert_eq!(cache.stats().entries, 0);
}

#[tokio::test]
async fn a_dropped_caller_does_not_cancel_the_shared_call() {
    let gateway = RecordingGateway::with_latency(Duration::from_millis(40));
    gateway.push_ok(json!({"id": 9, "name": "night shift"}));
    let cache = RequestCache::new(gateway);

    let background = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache.fetch("get_plan", Some(json!({"id": 9})), FIVE_SECS).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    background.abort();
    tokio::time::sleep(Duration::from_millis(80)).await;

    // The physical call ran to completion and populated the cache.
    let value = cache
        .fetch("get_plan", Some(json!({"id": 9})), FIVE_SECS)
        .await
        .unwrap();
    assert_eq!(cache.gateway().calls(), 1);
    assert_eq!(value, json!({"id": 9, "name": "night shift"}));
}

#[tokio::test]
async fn in_flight_calls_survive_invalidation() {
    let gateway = RecordingGateway::with_latency(Duration::from_millis(40));
    gateway.push_ok(json!({"id": 4}));
    let cache = RequestCache::new(gateway);

    let pending = {
        let cache = cache.clone();
        tokio::spawn(async move {
            cache.fetch("get_plan", Some(json!({"id": 4})), FIVE_SECS).await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.invalidate(None);

    pending.await.unwrap().unwrap();
    // The call started before the invalidation still populated an entry.
    let value = cache
        .fetch("get_plan", Some(json!({"id": 4})), FIVE_SECS)
        .await
        .unwrap();
    assert_eq!(cache.gateway().calls(), 1);
    assert_eq!(value, json!({"id": 4}));
}
