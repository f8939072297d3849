//! Request/response behaviour against the in-process store

mod common;

use common::MemStore;
use revbench_client::KvClient;
use revbench_kv::{
    CompactRequest, Compare, DeleteRequest, KeyValue, KvError, PutRequest, RangeRequest, Request,
    Response, RevisionOracle, TxnRequest,
};
use tokio_test::{assert_err, assert_ok};

async fn put(client: &KvClient, key: &str, value: &str) -> i64 {
    assert_ok!(client.put(&PutRequest::new(key, value)).await).revision
}

#[tokio::test]
async fn test_put_then_range() {
    let store = MemStore::new();
    let client = store.client();

    let revision = put(&client, "a", "a").await;
    let range = assert_ok!(client.range(&RangeRequest::key("a")).await);

    assert_eq!(range.count, 1);
    assert!(!range.more);
    assert_eq!(range.kvs.len(), 1);
    let kv = &range.kvs[0];
    assert_eq!(kv.value, b"a".to_vec());
    assert_eq!(kv.version, 1);
    assert_eq!(kv.create_revision, kv.mod_revision);
    assert_eq!(kv.mod_revision, revision);
}

#[tokio::test]
async fn test_version_increments_and_resets() {
    let store = MemStore::new();
    let client = store.client();

    put(&client, "k", "1").await;
    let second = put(&client, "k", "2").await;
    let kv = assert_ok!(client.range(&RangeRequest::key("k")).await).kvs.remove(0);
    assert_eq!(kv.version, 2);
    assert_eq!(kv.mod_revision, second);
    assert!(kv.mod_revision > kv.create_revision);

    let deleted = assert_ok!(client.delete(&DeleteRequest::key("k")).await);
    assert_eq!(deleted.deleted, 1);

    let recreated = put(&client, "k", "3").await;
    let kv = assert_ok!(client.range(&RangeRequest::key("k")).await).kvs.remove(0);
    assert_eq!(kv.version, 1);
    assert_eq!(kv.create_revision, recreated);
}

#[tokio::test]
async fn test_delete_absent_key() {
    let store = MemStore::new();
    let client = store.client();
    put(&client, "other", "x").await;

    let before = store.revision();
    let response = assert_ok!(client.delete(&DeleteRequest::key("missing").with_prev_kv()).await);
    assert_eq!(response.deleted, 0);
    assert!(response.prev_kvs.is_empty());
    assert_eq!(store.revision(), before);
    assert!(!Response::Delete(response).is_write());
}

#[tokio::test]
async fn test_prev_kv_returned_on_request() {
    let store = MemStore::new();
    let client = store.client();
    put(&client, "a", "old").await;

    let response = assert_ok!(client.put(&PutRequest::new("a", "new").with_prev_kv()).await);
    assert_eq!(response.prev_kv.map(|kv| kv.value), Some(b"old".to_vec()));

    let response = assert_ok!(client.put(&PutRequest::new("a", "newer")).await);
    assert_eq!(response.prev_kv, None);

    let deleted = assert_ok!(client.delete(&DeleteRequest::prefix("a").with_prev_kv()).await);
    assert_eq!(deleted.prev_kvs.len(), 1);
    assert_eq!(deleted.prev_kvs[0].value, b"newer".to_vec());
}

#[tokio::test]
async fn test_limit_reports_more() {
    let store = MemStore::new();
    let client = store.client();
    for key in ["range_a", "range_b", "range_c"] {
        put(&client, key, key).await;
    }

    let range = assert_ok!(client.range(&RangeRequest::prefix("range_").with_limit(1)).await);
    assert_eq!(range.count, 3);
    assert!(range.more);
    assert_eq!(range.kvs.len(), 1);
    assert_eq!(range.kvs[0].key, b"range_a".to_vec());
}

#[tokio::test]
async fn test_range_ordering_and_projection() {
    let store = MemStore::new();
    let client = store.client();
    put(&client, "b", "1").await;
    put(&client, "a", "2").await;
    put(&client, "c", "0").await;

    let range = assert_ok!(client.range(&RangeRequest::all().order_by_mod_revision().descending()).await);
    let keys: Vec<_> = range.kvs.iter().map(|kv| kv.key_str().into_owned()).collect();
    assert_eq!(keys, vec!["c", "a", "b"]);

    let range = assert_ok!(client.range(&RangeRequest::all().order_by_value().keys_only()).await);
    let keys: Vec<_> = range.kvs.iter().map(|kv| kv.key_str().into_owned()).collect();
    assert_eq!(keys, vec!["c", "b", "a"]);
    assert!(range.kvs.iter().all(|kv| kv.value.is_empty()));

    let range = assert_ok!(client.range(&RangeRequest::from_key("b").count_only()).await);
    assert_eq!(range.count, 2);
    assert!(range.kvs.is_empty());
}

#[tokio::test]
async fn test_range_at_revision_is_repeatable() {
    let store = MemStore::new();
    let client = store.client();
    put(&client, "k1", "a").await;
    let pinned = put(&client, "k2", "b").await;
    put(&client, "k1", "changed").await;
    assert_ok!(client.delete(&DeleteRequest::key("k2")).await);

    let request = RangeRequest::prefix("k").at_revision(pinned);
    let first = assert_ok!(client.range(&request).await);
    let second = assert_ok!(client.range(&request).await);
    assert_eq!(first.kvs, second.kvs);
    assert_eq!(
        first.kvs,
        vec![
            KeyValue::new("k1", "a").with_revisions(1, 1, 1),
            KeyValue::new("k2", "b").with_revisions(2, 2, 1),
        ]
    );
}

#[tokio::test]
async fn test_compare_absent_key() {
    let store = MemStore::new();
    let client = store.client();
    let absent = Compare::mod_revision("lock", 0).equal();

    let txn = TxnRequest::new()
        .when([absent.clone()])
        .and_then([RangeRequest::key("lock").into()]);
    assert!(assert_ok!(client.txn(&txn).await).succeeded);

    put(&client, "lock", "held").await;
    assert!(!assert_ok!(client.txn(&txn).await).succeeded);
}

#[tokio::test]
async fn test_failed_compare_applies_no_success_write() {
    let store = MemStore::new();
    let client = store.client();
    put(&client, "guard", "1").await;

    let txn = TxnRequest::new()
        .when([Compare::value("guard", "2")])
        .and_then([PutRequest::new("a", "x").into(), PutRequest::new("b", "x").into()])
        .or_else([RangeRequest::key("guard").into()]);
    let response = assert_ok!(client.txn(&txn).await);

    assert!(!response.succeeded);
    assert_eq!(response.responses.len(), 1);
    assert!(matches!(response.responses[0], Response::Range(_)));
    let range = assert_ok!(client.range(&RangeRequest::between("a", "c")).await);
    assert_eq!(range.count, 0);
}

#[tokio::test]
async fn test_txn_writes_share_one_revision() {
    let store = MemStore::new();
    let client = store.client();
    let before = store.revision();

    let nested = TxnRequest::new()
        .when([Compare::version("a", 0).greater()])
        .and_then([PutRequest::new("c", "3").into()]);
    let txn = TxnRequest::new().and_then([
        PutRequest::new("a", "1").into(),
        PutRequest::new("b", "2").into(),
        nested.into(),
    ]);
    let response = assert_ok!(client.txn(&txn).await);

    assert!(response.succeeded);
    assert_eq!(response.revision, before + 1);
    assert_eq!(response.responses.len(), 3);
    let inner = response.responses[2].as_txn().unwrap();
    assert!(inner.succeeded, "nested compare sees earlier writes of the branch");

    let range = assert_ok!(client.range(&RangeRequest::all()).await);
    assert_eq!(range.count, 3);
    assert!(range.kvs.iter().all(|kv| kv.mod_revision == before + 1));
}

#[tokio::test]
async fn test_duplicate_key_rejected_atomically() {
    let store = MemStore::new();
    let client = store.client();

    let txn = TxnRequest::new().and_then([
        PutRequest::new("x", "1").into(),
        PutRequest::new("y", "1").into(),
        PutRequest::new("x", "2").into(),
    ]);
    let err = assert_err!(client.txn(&txn).await);
    assert_eq!(err.kv_error(), Some(KvError::DuplicateKey));

    let range = assert_ok!(client.range(&RangeRequest::all()).await);
    assert_eq!(range.count, 0);
    assert_eq!(store.revision(), 0);
}

#[tokio::test]
async fn test_nested_branches_may_write_same_key() {
    let store = MemStore::new();
    let client = store.client();

    let upsert = TxnRequest::new()
        .when([Compare::mod_revision("n", 0).equal()])
        .and_then([PutRequest::new("n", "created").into()])
        .or_else([PutRequest::new("n", "updated").into()]);
    let txn = TxnRequest::new().and_then([upsert.into()]);

    assert_ok!(client.txn(&txn).await);
    assert_ok!(client.txn(&txn).await);

    let range = assert_ok!(client.range(&RangeRequest::key("n")).await);
    assert_eq!(range.kvs[0].value, b"updated".to_vec());
    assert_eq!(range.kvs[0].version, 2);
    assert_eq!(store.revision(), 2);
}

#[tokio::test]
async fn test_empty_key_rejected() {
    let store = MemStore::new();
    let client = store.client();

    let err = assert_err!(client.range(&RangeRequest::key("")).await);
    assert_eq!(err.kv_error(), Some(KvError::EmptyKey));
    let err = assert_err!(client.put(&PutRequest::new("", "v")).await);
    assert_eq!(err.kv_error(), Some(KvError::EmptyKey));
}

#[tokio::test]
async fn test_ignore_value_on_absent_key() {
    let store = MemStore::new();
    let client = store.client();

    let err = assert_err!(client.put(&PutRequest::new("k", "").ignore_value()).await);
    assert_eq!(err.kv_error(), Some(KvError::KeyNotFound));

    put(&client, "k", "kept").await;
    assert_ok!(client.put(&PutRequest::new("k", "").ignore_value()).await);
    let kv = assert_ok!(client.range(&RangeRequest::key("k")).await).kvs.remove(0);
    assert_eq!(kv.value, b"kept".to_vec());
    assert_eq!(kv.version, 2);
}

#[tokio::test]
async fn test_compacted_and_future_revisions() {
    let store = MemStore::new();
    let client = store.client();
    for i in 0..5 {
        put(&client, "k", &i.to_string()).await;
    }

    let err = assert_err!(client.range(&RangeRequest::key("k").at_revision(99)).await);
    assert_eq!(err.kv_error(), Some(KvError::FutureRevision));
    assert!(err.kv_error().is_some_and(|kind| kind.is_consistency()));

    assert_ok!(client.compact(&CompactRequest::new(3)).await);
    let err = assert_err!(client.range(&RangeRequest::key("k").at_revision(2)).await);
    assert_eq!(err.kv_error(), Some(KvError::Compacted));

    let kv = assert_ok!(client.range(&RangeRequest::key("k").at_revision(3)).await).kvs.remove(0);
    assert_eq!(kv.value, b"2".to_vec());

    let err = assert_err!(client.compact(&CompactRequest::new(3)).await);
    assert_eq!(err.kv_error(), Some(KvError::Compacted));
}

#[tokio::test]
async fn test_revisions_follow_operation_order() {
    let store = MemStore::new();
    let client = store.client();
    let mut oracle = RevisionOracle::new();

    let requests: Vec<Request> = vec![
        PutRequest::new("a", "1").into(),
        RangeRequest::key("a").into(),
        PutRequest::new("b", "1").into(),
        DeleteRequest::key("missing").into(),
        DeleteRequest::key("a").into(),
        TxnRequest::new()
            .when([Compare::mod_revision("a", 0)])
            .and_then([PutRequest::new("a", "2").into()])
            .into(),
        TxnRequest::new()
            .when([Compare::mod_revision("a", 0)])
            .or_else([RangeRequest::key("a").into()])
            .into(),
        CompactRequest::new(2).into(),
    ];

    for request in &requests {
        let response = assert_ok!(client.execute(request).await);
        assert_ok!(oracle.observe(&response), "{} broke revision order", request.name());
    }
    assert_eq!(oracle.current(), Some(store.revision()));
}
