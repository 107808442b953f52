//! End-to-end waiter scenarios through the public API.

use std::time::Duration;

use facility_athena::*;

use crate::fake::FakeCatalog;

#[tokio::test(start_paused = true)]
async fn completed_query_returns_final_payload() {
    let catalog = FakeCatalog::default();
    let request = QueryRequest {
        sql: "SELECT 1".into(),
        database: "healthcare_db".into(),
        output_location: "s3://out/athena-results/".into(),
        workgroup: "primary".into(),
    };
    let handle = catalog.submit_query(&request).await.unwrap();

    let done = QueryCompletionWaiter::default()
        .wait(&catalog, &handle, Duration::from_secs(10), None)
        .await
        .unwrap();

    assert_eq!(done.report.query_id, handle.as_str());
    assert_eq!(done.report.status, QueryStatus::Succeeded);
    assert!(done.elapsed < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn unknown_handle_is_a_validation_error() {
    let catalog = FakeCatalog::default();
    let handle = QueryHandle::new("does-not-exist").unwrap();

    let err = QueryCompletionWaiter::default()
        .wait(&catalog, &handle, Duration::from_secs(10), None)
        .await
        .unwrap_err();

    assert!(matches!(err, AthenaError::Validation(_)));
}

#[test]
fn budget_arithmetic() {
    let waiter = QueryCompletionWaiter::default();
    let max = Duration::from_secs(240);

    assert_eq!(waiter.budget(max, None).limit(), max);
    assert_eq!(waiter.budget(max, Some(Duration::from_secs(250))).limit(), max);
    assert_eq!(
        waiter.budget(max, Some(Duration::from_secs(100))).limit(),
        Duration::from_secs(90)
    );
    assert!(waiter.budget(max, Some(Duration::from_secs(10))).is_exhausted());
}
