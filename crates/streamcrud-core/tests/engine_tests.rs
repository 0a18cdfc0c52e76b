//! Integration tests for the sync engine against a scripted transport.
//!
//! Every test drives real engine operations and inspects the resulting
//! snapshot, the requests the transport saw, the hooks that ran, and the
//! failure records that reached the sink.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::{ENDPOINT, Recorder, ScriptedTransport, TestEngine, name_of, named, resource};
use serde_json::json;
use streamcrud_core::{
    DecodeError, EngineConfig, ItemId, JsonItem, MemorySink, Method, QueryParams, SyncEngine,
    SyncError, TransportError, UpdateVerb,
};

fn engine_with(transport: &ScriptedTransport, sink: &Arc<MemorySink>) -> TestEngine {
    SyncEngine::builder(resource(), transport.clone())
        .sink(Arc::clone(sink))
        .build()
}

fn ids(engine: &TestEngine) -> Vec<ItemId> {
    engine.current().ids()
}

// =========================================================================
// fetch_all
// =========================================================================

#[tokio::test]
async fn fetch_all_replaces_the_snapshot() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1}, {"id": 2}]))
        .push_ok(json!([{"id": 3}]));
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);

    engine.fetch_all(None, false).await;
    assert_eq!(ids(&engine), vec![ItemId::Int(1), ItemId::Int(2)]);

    engine.fetch_all(None, false).await;
    assert_eq!(ids(&engine), vec![ItemId::Int(3)]);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn fetch_all_with_append_merges() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]))
        .push_ok(json!([{"id": 2, "name": "B"}, {"id": 3, "name": "c"}]));
    let engine = SyncEngine::new(resource(), transport.clone());

    engine.fetch_all(None, false).await;
    engine.fetch_all(None, true).await;

    let snapshot = engine.current();
    let names: Vec<_> = snapshot.iter().map(name_of).collect();
    assert_eq!(names, vec!["a", "B", "c"]);
}

#[tokio::test]
async fn params_become_query_parameters() {
    let transport = ScriptedTransport::new();
    transport.always(Ok(json!([])));
    let engine = SyncEngine::new(resource(), transport.clone());

    let mut params = QueryParams::new();
    params.insert("shelf".to_owned(), "fiction".to_owned());
    engine.fetch_all(Some(&params), false).await;
    engine.fetch_all(None, false).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    let first = requests.first().unwrap();
    assert_eq!(first.method, Method::Get);
    assert_eq!(first.path(), ENDPOINT);
    assert_eq!(first.query.get("shelf").map(String::as_str), Some("fiction"));
    assert!(requests.get(1).unwrap().query.is_empty());
}

#[tokio::test]
async fn non_array_collection_is_reported_as_decode_failure() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!({"id": 1}));
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);

    engine.fetch_all(None, false).await;

    assert!(engine.current().is_empty());
    let failures = sink.recent();
    assert_eq!(failures.len(), 1);
    let failure = failures.first().unwrap();
    assert_eq!(failure.http_method, Method::Get);
    assert!(matches!(
        failure.error,
        SyncError::Decode(DecodeError::Shape(_))
    ));
}

// =========================================================================
// Retry policy
// =========================================================================

#[tokio::test]
async fn failing_call_is_attempted_exactly_three_times() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);

    engine.fetch_all(None, false).await;

    assert_eq!(transport.requests().len(), 3);
    let failures = sink.recent();
    assert_eq!(failures.len(), 1);
    let failure = failures.first().unwrap();
    assert_eq!(failure.message, "Something went wrong!");
    assert_eq!(failure.http_method, Method::Get);
    assert!(matches!(
        failure.error,
        SyncError::Transport { attempts: 3, .. }
    ));
}

#[tokio::test]
async fn success_on_last_attempt_is_not_a_failure() {
    let transport = ScriptedTransport::new();
    transport
        .push_err(TransportError::Status {
            status: 503,
            body: String::new(),
        })
        .push_err(TransportError::Request("reset".to_owned()))
        .push_ok(json!([{"id": 1}]));
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);

    engine.fetch_all(None, false).await;

    assert_eq!(transport.requests().len(), 3);
    assert_eq!(ids(&engine), vec![ItemId::Int(1)]);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn retry_count_is_configurable() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(MemorySink::new(8));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .config(EngineConfig {
            retries: 0,
            ..EngineConfig::default()
        })
        .sink(Arc::clone(&sink))
        .build();

    engine.fetch_one(&ItemId::Int(1), None).await;

    assert_eq!(transport.requests().len(), 1);
    assert_eq!(sink.len(), 1);
}

// =========================================================================
// fetch_one
// =========================================================================

#[tokio::test]
async fn fetch_one_requests_the_collection_and_merges() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1, "name": "a"}]))
        .push_ok(json!({"id": 2, "name": "b"}));
    let engine = SyncEngine::new(resource(), transport.clone());
    engine.fetch_all(None, false).await;

    engine.fetch_one(&ItemId::Int(2), None).await;

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.id, None);
    assert_eq!(request.path(), ENDPOINT);
    assert_eq!(ids(&engine), vec![ItemId::Int(1), ItemId::Int(2)]);
}

#[tokio::test]
async fn fetch_one_merges_a_collection_payload() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1, "name": "a"}]))
        .push_ok(json!([{"id": 1, "name": "A"}, {"id": 5, "name": "five"}]));
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);
    engine.fetch_all(None, false).await;

    engine.fetch_one(&ItemId::Int(5), None).await;

    assert_eq!(ids(&engine), vec![ItemId::Int(1), ItemId::Int(5)]);
    let first = engine.current().find(&ItemId::Int(1)).cloned().unwrap();
    assert_eq!(name_of(&first), "A");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn fetch_one_by_id_rejects_a_collection_payload() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!([{"id": 9}]));
    let sink = Arc::new(MemorySink::new(8));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .sink(Arc::clone(&sink))
        .config(EngineConfig {
            fetch_one_by_id: true,
            ..EngineConfig::default()
        })
        .build();

    engine.fetch_one(&ItemId::Int(9), None).await;

    assert!(engine.current().is_empty());
    let failure = sink.recent().pop().unwrap();
    assert!(matches!(failure.error, SyncError::Decode(DecodeError::Invalid(_))));
}

#[tokio::test]
async fn fetch_one_by_id_targets_the_item_path() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!({"id": 9}));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .config(EngineConfig {
            fetch_one_by_id: true,
            ..EngineConfig::default()
        })
        .build();

    engine.fetch_one(&ItemId::Int(9), None).await;

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.path(), "/api/items/9");
    assert_eq!(ids(&engine), vec![ItemId::Int(9)]);
}

#[tokio::test]
async fn fetch_one_failure_carries_the_item_id() {
    let transport = ScriptedTransport::new();
    let sink = Arc::new(MemorySink::new(8));
    let engine = engine_with(&transport, &sink);

    engine.fetch_one(&ItemId::from("abc"), None).await;

    let failure = sink.recent().pop().unwrap();
    assert_eq!(failure.item_id, Some(ItemId::from("abc")));
    assert_eq!(failure.endpoint, ENDPOINT);
}

// =========================================================================
// create / update / delete
// =========================================================================

#[tokio::test]
async fn create_posts_body_merges_response_and_runs_hook() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!({"id": 10, "name": "server-side"}));
    let created = Recorder::default();
    let engine = SyncEngine::builder(resource(), transport.clone())
        .on_create(created.hook())
        .build();

    engine.create(&named(0, "draft"), None).await;

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path(), ENDPOINT);
    assert_eq!(request.body, Some(json!({"id": 0, "name": "draft"})));

    assert_eq!(ids(&engine), vec![ItemId::Int(10)]);
    let seen = created.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen.first().map(name_of).as_deref(), Some("server-side"));
}

#[tokio::test]
async fn update_posts_to_item_path_and_keeps_position() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]))
        .push_ok(json!({"id": 1, "name": "renamed"}));
    let updated = Recorder::default();
    let engine = SyncEngine::builder(resource(), transport.clone())
        .on_update(updated.hook())
        .build();
    engine.fetch_all(None, false).await;

    engine.update(&named(1, "renamed"), None).await;

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path(), "/api/items/1");
    let names: Vec<_> = engine.current().iter().map(name_of).collect();
    assert_eq!(names, vec!["renamed", "b"]);
    assert_eq!(updated.seen().len(), 1);
}

#[tokio::test]
async fn update_can_use_put() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!({"id": "k"}));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .config(EngineConfig {
            update_verb: UpdateVerb::Put,
            ..EngineConfig::default()
        })
        .build();

    engine.update(&JsonItem::new("k"), None).await;

    assert_eq!(transport.count(Method::Put), 1);
    assert_eq!(transport.count(Method::Post), 0);
}

#[tokio::test]
async fn delete_removes_item_and_runs_hook() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1}, {"id": 2, "name": "gone"}]))
        .push_ok(serde_json::Value::Null);
    let deleted = Recorder::default();
    let engine = SyncEngine::builder(resource(), transport.clone())
        .on_delete(deleted.hook())
        .build();
    engine.fetch_all(None, false).await;

    let target = named(2, "gone");
    engine.delete(&target, None).await;

    let request = transport.requests().pop().unwrap();
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.path(), "/api/items/2");
    assert_eq!(ids(&engine), vec![ItemId::Int(1)]);
    assert_eq!(deleted.seen(), vec![target]);
}

#[tokio::test]
async fn failed_delete_keeps_item_and_skips_hook() {
    let transport = ScriptedTransport::new();
    transport.push_ok(json!([{"id": 1}, {"id": 2}]));
    let deleted = Recorder::default();
    let sink = Arc::new(MemorySink::new(8));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .on_delete(deleted.hook())
        .sink(Arc::clone(&sink))
        .build();
    engine.fetch_all(None, false).await;

    engine.delete(&JsonItem::new(2), None).await;

    assert_eq!(transport.count(Method::Delete), 3);
    assert_eq!(ids(&engine), vec![ItemId::Int(1), ItemId::Int(2)]);
    assert!(deleted.seen().is_empty());
    let failure = sink.recent().pop().unwrap();
    assert_eq!(failure.http_method, Method::Delete);
    assert_eq!(failure.item_id, Some(ItemId::Int(2)));
}

#[tokio::test]
async fn failed_create_skips_hook() {
    let transport = ScriptedTransport::new();
    let created = Recorder::default();
    let sink = Arc::new(MemorySink::new(8));
    let engine = SyncEngine::builder(resource(), transport.clone())
        .on_create(created.hook())
        .sink(Arc::clone(&sink))
        .build();

    engine.create(&named(1, "a"), None).await;

    assert!(engine.current().is_empty());
    assert!(created.seen().is_empty());
    assert_eq!(sink.recent().pop().map(|f| f.http_method), Some(Method::Post));
}

// =========================================================================
// Emissions
// =========================================================================

#[tokio::test]
async fn one_merge_call_produces_one_emission() {
    let transport = ScriptedTransport::new();
    transport
        .push_ok(json!([{"id": 1, "name": "a"}]))
        .push_ok(json!([{"id": 1, "name": "b"}, {"id": 2, "name": "c"}]));
    let engine = SyncEngine::new(resource(), transport.clone());
    engine.fetch_all(None, false).await;

    let mut stream = engine.subscribe();
    let before = stream.next().await.unwrap();
    let revision = engine.store().revision();

    engine.fetch_all(None, true).await;

    assert_eq!(engine.store().revision(), revision.saturating_add(1));
    let after = stream.next().await.unwrap();
    assert!(!after.ptr_eq(&before));
    let names: Vec<_> = after.iter().map(name_of).collect();
    assert_eq!(names, vec!["b", "c"]);
    assert!(!stream.has_pending());
}

#[tokio::test]
async fn spawned_operations_run_in_background() {
    let transport = ScriptedTransport::new();
    transport.always(Ok(json!({"id": 4})));
    let engine = SyncEngine::new(resource(), transport.clone());

    engine.spawn_fetch_one(ItemId::Int(4), None).await.unwrap();
    engine.spawn_create(named(5, "e"), None).await.unwrap();

    assert_eq!(ids(&engine), vec![ItemId::Int(4)]);
    assert_eq!(transport.count(Method::Get), 1);
    assert_eq!(transport.count(Method::Post), 1);
}
