//! The notification handler end to end: filtering, decoding, failure policy.

use std::sync::Arc;
use std::time::Duration;

use facility_athena::mock::ScriptedQueryService;
use facility_athena::{AthenaError, QueryStatus};
use facility_pipeline::{HandlerResponse, InvocationContext, PipelineError, ProcessedResults};
use facility_storage::mock::InMemoryStorage;
use tokio_util::sync::CancellationToken;

use crate::common::{event_json, pipeline, state_rows, OUTPUT_BUCKET};

fn setup() -> (Arc<ScriptedQueryService>, Arc<InMemoryStorage>) {
    let service = Arc::new(ScriptedQueryService::new());
    service.set_results(state_rows());
    (service, Arc::new(InMemoryStorage::new()))
}

#[tokio::test(start_paused = true)]
async fn non_json_files_are_skipped() {
    let (service, storage) = setup();

    let response = pipeline(&service, &storage)
        .handle_json(&event_json(&["uploads/readme.txt", "data.json.gz"]), &InvocationContext::new())
        .await
        .unwrap();

    assert_eq!(response, HandlerResponse::success());
    assert!(service.submitted().is_empty());
    assert!(storage.keys(OUTPUT_BUCKET, "").is_empty());
}

#[tokio::test(start_paused = true)]
async fn data_file_is_processed_and_published() {
    let (service, storage) = setup();
    // Aggregation is the third submission, after the two DDL statements.
    storage.insert(OUTPUT_BUCKET, "athena-results/q-3.csv", "state,facility_count\n");

    let response = pipeline(&service, &storage)
        .handle_json(&event_json(&["incoming/facility+batch%2B1.json"]), &InvocationContext::new())
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);

    let sql = service.submitted_sql();
    assert_eq!(sql.len(), 3);
    assert!(sql[0].starts_with("CREATE DATABASE IF NOT EXISTS"));
    assert!(sql[1].starts_with("CREATE EXTERNAL TABLE IF NOT EXISTS"));
    assert!(sql[2].contains("GROUP BY location.state"));

    let json_keys = storage.keys(OUTPUT_BUCKET, "processed-results/");
    assert_eq!(json_keys.len(), 1);
    assert!(json_keys[0].ends_with("-facility batch+1.json"), "{}", json_keys[0]);

    let stored = storage.get(OUTPUT_BUCKET, &json_keys[0]).unwrap();
    assert_eq!(stored.content_type.as_deref(), Some("application/json"));

    let doc: ProcessedResults = serde_json::from_slice(&stored.body).unwrap();
    assert_eq!(doc.query_execution_id, "q-3");
    assert_eq!(doc.source_file, "incoming/facility batch+1.json");
    assert_eq!(doc.result_count, 2);
    assert_eq!(doc.results[0]["state"], "TX");
    assert_eq!(doc.results[1]["total_employees"], "");

    let csv_keys = storage.keys(OUTPUT_BUCKET, "csv-results/");
    assert_eq!(csv_keys.len(), 1);
    assert!(csv_keys[0].ends_with("-results.csv"));
}

#[tokio::test(start_paused = true)]
async fn each_data_file_gets_its_own_run() {
    let (service, storage) = setup();

    pipeline(&service, &storage)
        .handle_json(
            &event_json(&["a.json", "skip.csv", "b.jsonl"]),
            &InvocationContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(service.submitted().len(), 6);
    assert_eq!(storage.keys(OUTPUT_BUCKET, "processed-results/").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn undecodable_key_is_still_processed() {
    let (service, storage) = setup();

    pipeline(&service, &storage)
        .handle_json(&event_json(&["good.json", "bad%FF.json"]), &InvocationContext::new())
        .await
        .unwrap();

    assert_eq!(service.submitted().len(), 6);
    let json_keys = storage.keys(OUTPUT_BUCKET, "processed-results/");
    assert_eq!(json_keys.len(), 2);
    assert!(json_keys.iter().any(|k| k.ends_with("-bad\u{FFFD}.json")), "{json_keys:?}");
}

#[tokio::test(start_paused = true)]
async fn failing_file_fails_the_batch() {
    let service = Arc::new(ScriptedQueryService::with_statuses([
        QueryStatus::Succeeded,
        QueryStatus::Succeeded,
    ]));
    service.push_status(QueryStatus::Failed, Some("SYNTAX_ERROR: line 3:5"));
    let storage = Arc::new(InMemoryStorage::new());

    let err = pipeline(&service, &storage)
        .handle_json(&event_json(&["first.json", "second.json"]), &InvocationContext::new())
        .await
        .unwrap_err();

    match err {
        PipelineError::Athena(AthenaError::QueryFailed { status, reason, .. }) => {
            assert_eq!(status, QueryStatus::Failed);
            assert_eq!(reason, "SYNTAX_ERROR: line 3:5");
        }
        other => panic!("unexpected error: {other}"),
    }
    // second.json never started
    assert_eq!(service.submitted().len(), 3);
    assert!(storage.keys(OUTPUT_BUCKET, "processed-results/").is_empty());
}

#[tokio::test(start_paused = true)]
async fn csv_copy_failure_does_not_fail_the_batch() {
    let (service, storage) = setup();
    storage.fail_copies("AccessDenied");

    let response = pipeline(&service, &storage)
        .handle_json(&event_json(&["facilities.json"]), &InvocationContext::new())
        .await
        .unwrap();

    assert_eq!(response, HandlerResponse::success());
    assert_eq!(storage.keys(OUTPUT_BUCKET, "processed-results/").len(), 1);
    assert!(storage.keys(OUTPUT_BUCKET, "csv-results/").is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_csv_does_not_fail_the_batch() {
    let (service, storage) = setup();

    pipeline(&service, &storage)
        .handle_json(&event_json(&["facilities.json"]), &InvocationContext::new())
        .await
        .unwrap();

    assert_eq!(storage.keys(OUTPUT_BUCKET, "processed-results/").len(), 1);
    assert!(storage.keys(OUTPUT_BUCKET, "csv-results/").is_empty());
}

#[tokio::test(start_paused = true)]
async fn json_write_failure_fails_the_batch() {
    let (service, storage) = setup();
    storage.fail_puts("SlowDown");

    let err = pipeline(&service, &storage)
        .handle_json(&event_json(&["facilities.json"]), &InvocationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Storage(_)), "{err}");
}

#[tokio::test(start_paused = true)]
async fn remaining_time_caps_the_query_wait() {
    let service = Arc::new(ScriptedQueryService::with_statuses([
        QueryStatus::Succeeded,
        QueryStatus::Succeeded,
        QueryStatus::Running,
    ]));
    let storage = Arc::new(InMemoryStorage::new());

    // 15s left minus the 10s margin: polls at 0s, 2s, 4s, then out of budget.
    let ctx = InvocationContext::with_timeout(Duration::from_secs(15));
    let err = pipeline(&service, &storage)
        .handle_json(&event_json(&["facilities.json"]), &ctx)
        .await
        .unwrap_err();

    assert!(
        matches!(err, PipelineError::Athena(AthenaError::QueryTimeout { ref query_id, .. }) if query_id == "q-3"),
        "{err}"
    );
    assert_eq!(service.status_call_count(), 2 + 3);
}

#[tokio::test(start_paused = true)]
async fn no_time_left_skips_the_query_wait() {
    let service = Arc::new(ScriptedQueryService::with_statuses([
        QueryStatus::Succeeded,
        QueryStatus::Succeeded,
        QueryStatus::Running,
    ]));
    let storage = Arc::new(InMemoryStorage::new());

    let ctx = InvocationContext::with_timeout(Duration::from_secs(8));
    let err = pipeline(&service, &storage)
        .handle_json(&event_json(&["facilities.json"]), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Athena(AthenaError::QueryTimeout { .. })));
    // Only the DDL waits polled.
    assert_eq!(service.status_call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_abandons_the_wait() {
    let service = Arc::new(ScriptedQueryService::with_statuses([
        QueryStatus::Succeeded,
        QueryStatus::Succeeded,
        QueryStatus::Running,
    ]));
    let storage = Arc::new(InMemoryStorage::new());
    let token = CancellationToken::new();
    token.cancel();

    let err = pipeline(&service, &storage)
        .with_shutdown(token)
        .handle_json(&event_json(&["facilities.json"]), &InvocationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Athena(AthenaError::Interrupted { .. })));
    assert!(storage.keys(OUTPUT_BUCKET, "").is_empty());
}

#[tokio::test]
async fn malformed_event_is_rejected() {
    let (service, storage) = setup();

    let err = pipeline(&service, &storage)
        .handle_json(r#"{"Records": [{"s3": {}}]}"#, &InvocationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidEvent(_)));
    assert!(service.submitted().is_empty());
}
