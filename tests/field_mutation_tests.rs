/// Field mutation tests
///
/// Server-side counter and array-append statements on results and stats
/// Run with: cargo test --test field_mutation_tests
use bucketlink::store::{BucketOp, Fault};
use bucketlink::{
    AccessErrorKind, ArrayAppends, BucketClient, BucketConfig, CounterMutations, JsonObject,
    MemoryCluster, StoreFailure,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn object(value: Value) -> JsonObject {
    value.as_object().cloned().unwrap()
}

fn client() -> (Arc<MemoryCluster>, BucketClient) {
    let cluster = Arc::new(MemoryCluster::new());
    let client = BucketClient::connect(cluster.clone(), BucketConfig::default()).unwrap();
    (cluster, client)
}

#[tokio::test]
async fn test_result_walkthrough() {
    let (_, client) = client();
    let results = client.results();

    results.create("r1", JsonObject::new()).await.unwrap();

    let counted = results.add_one_to_contributions_count("r1").await.unwrap();
    assert_eq!(
        counted.to_json(),
        json!({"id": "r1", "contributions_count": 1})
    );

    let appended = results
        .add_result_for_template("r1", "yes", object(json!({"lat": 1, "lng": 2})))
        .await
        .unwrap();
    assert_eq!(
        appended.to_json(),
        json!({"id": "r1", "location": {"lat": 1, "lng": 2}})
    );

    assert_eq!(
        results.fetch("r1").await.unwrap().to_json(),
        json!({
            "id": "r1",
            "contributions_count": 1,
            "results": {"yes": [{"lat": 1, "lng": 2}]}
        })
    );
}

#[tokio::test]
async fn test_increment_then_decrement_restores_value() {
    let (_, client) = client();
    let stats = client.stats();

    stats
        .create("s1", object(json!({"enrollments_count": 7})))
        .await
        .unwrap();

    let up = stats.add_one_to_enrollments_count("s1").await.unwrap();
    assert_eq!(up.get("enrollments_count"), Some(&json!(8)));

    let down = stats.remove_one_from_enrollments_count("s1").await.unwrap();
    assert_eq!(down.to_json(), json!({"id": "s1", "enrollments_count": 7}));
}

#[tokio::test]
async fn test_counter_may_go_negative() {
    let (_, client) = client();
    let stats = client.stats();

    stats.create("s1", JsonObject::new()).await.unwrap();
    let down = stats.remove_one_from_enrollments_count("s1").await.unwrap();
    assert_eq!(down.get("enrollments_count"), Some(&json!(-1)));
}

#[tokio::test]
async fn test_generic_counter_on_other_field() {
    let (_, client) = client();
    let results = client.results();

    results
        .create("r1", object(json!({"skips": 2})))
        .await
        .unwrap();
    let doc = results.increment_field("r1", "skips").await.unwrap();
    assert_eq!(doc.to_json(), json!({"id": "r1", "skips": 3}));
}

#[tokio::test]
async fn test_append_to_other_category_leaves_existing_untouched() {
    let (_, client) = client();
    let results = client.results();

    results.create("r1", JsonObject::new()).await.unwrap();
    results
        .add_result_for_template("r1", "yes", object(json!({"lat": 1, "lng": 2})))
        .await
        .unwrap();
    results
        .add_result_for_template("r1", "yes", object(json!({"lat": 3, "lng": 4})))
        .await
        .unwrap();
    results
        .add_result_for_template("r1", "no", object(json!({"lat": 5, "lng": 6})))
        .await
        .unwrap();

    let fetched = results.fetch("r1").await.unwrap();
    assert_eq!(
        fetched.get("results"),
        Some(&json!({
            "yes": [{"lat": 1, "lng": 2}, {"lat": 3, "lng": 4}],
            "no": [{"lat": 5, "lng": 6}]
        }))
    );
}

#[tokio::test]
async fn test_generic_append_returns_alias() {
    let (_, client) = client();
    let results = client.results();

    results.create("r1", JsonObject::new()).await.unwrap();
    let doc = results
        .append_element("r1", "answers", "maybe", json!("unsure"), "answer")
        .await
        .unwrap();

    assert_eq!(doc.to_json(), json!({"id": "r1", "answer": "unsure"}));
}

#[tokio::test]
async fn test_invalid_category_makes_no_store_call() {
    let (cluster, client) = client();
    let results = client.results();
    results.create("r1", JsonObject::new()).await.unwrap();

    for answer in ["bad-key", "", "yes.no", "1st", "select"] {
        let err = results
            .add_result_for_template("r1", answer, object(json!({"lat": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AccessErrorKind::StoreError, "{answer:?}");
    }

    let bucket = cluster.bucket("crowd").await;
    assert_eq!(bucket.calls(BucketOp::Query), 0);
    let (stored, _) = bucket.peek("r1").await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_mutators_on_missing_document_are_not_found() {
    let (_, client) = client();

    let err = client
        .results()
        .add_one_to_contributions_count("ghost")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::NotFound);

    let err = client
        .stats()
        .remove_one_from_enrollments_count("ghost")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::NotFound);

    let err = client
        .results()
        .add_result_for_template("ghost", "yes", object(json!({"lat": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::NotFound);
}

#[tokio::test]
async fn test_version_mismatch_on_statement_is_conflict() {
    let (cluster, client) = client();
    let results = client.results();
    results.create("r1", JsonObject::new()).await.unwrap();

    let bucket = cluster.bucket("crowd").await;
    bucket
        .inject(
            BucketOp::Query,
            Fault::Fail(StoreFailure::VersionMismatch("r1".into())),
        )
        .await;

    let err = results
        .add_one_to_contributions_count("r1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::ConcurrencyConflict);
    assert_eq!(bucket.calls(BucketOp::Query), 1);

    let (stored, _) = bucket.peek("r1").await.unwrap();
    assert!(stored.get("contributions_count").is_none());
}

#[tokio::test]
async fn test_non_numeric_counter_is_store_error() {
    let (_, client) = client();
    let stats = client.stats();

    stats
        .create("s1", object(json!({"enrollments_count": "lots"})))
        .await
        .unwrap();
    let err = stats.add_one_to_enrollments_count("s1").await.unwrap_err();

    assert_eq!(err.kind(), AccessErrorKind::StoreError);
    assert_eq!(
        stats.fetch("s1").await.unwrap().get("enrollments_count"),
        Some(&json!("lots"))
    );
}

#[tokio::test]
async fn test_counter_overflow_is_store_error() {
    let (cluster, client) = client();
    let stats = client.stats();

    stats
        .create("s1", object(json!({"enrollments_count": i64::MAX})))
        .await
        .unwrap();
    let before = cluster.bucket("crowd").await.peek("s1").await.unwrap();

    let err = stats.add_one_to_enrollments_count("s1").await.unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::StoreError);
    assert_eq!(cluster.bucket("crowd").await.peek("s1").await.unwrap(), before);

    stats
        .update("s1", object(json!({"enrollments_count": i64::MIN})))
        .await
        .unwrap();
    let err = stats
        .remove_one_from_enrollments_count("s1")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::StoreError);
    assert_eq!(
        stats.fetch("s1").await.unwrap().get("enrollments_count"),
        Some(&json!(i64::MIN))
    );
}

#[tokio::test]
async fn test_mutation_restamps_cas() {
    let (cluster, client) = client();
    let stats = client.stats();

    let created = stats.create("s1", JsonObject::new()).await.unwrap();
    stats.add_one_to_enrollments_count("s1").await.unwrap();

    let (_, cas) = cluster.bucket("crowd").await.peek("s1").await.unwrap();
    assert_ne!(Some(cas), created.cas());

    let err = stats
        .update_versioned("s1", JsonObject::new(), created.cas().unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AccessErrorKind::ConcurrencyConflict);
}
