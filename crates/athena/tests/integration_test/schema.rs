//! SchemaEnsurer against the fake catalog: idempotency and failure surfacing.

use std::time::Duration;

use facility_athena::*;

use crate::fake::FakeCatalog;

fn facilities() -> FacilityTable {
    FacilityTable {
        database: "healthcare_db".into(),
        table: "facilities".into(),
        source_bucket: "medlaunch-assignment".into(),
        output_location: "s3://medlaunch-query-output/athena-results/".into(),
        workgroup: "primary".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn ensure_twice_is_idempotent() {
    let catalog = FakeCatalog::default();
    let ensurer = SchemaEnsurer::new(facilities(), Duration::from_secs(30));
    let waiter = QueryCompletionWaiter::default();

    ensurer.ensure(&catalog, &waiter).await.expect("first ensure");
    let after_first = (catalog.databases(), catalog.tables());

    ensurer.ensure(&catalog, &waiter).await.expect("second ensure");
    let after_second = (catalog.databases(), catalog.tables());

    assert_eq!(after_first, after_second);
    assert_eq!(after_second.0, ["healthcare_db"]);
    assert_eq!(after_second.1, ["healthcare_db.facilities"]);

    let statements = catalog.statements();
    assert_eq!(statements.len(), 4);
    assert_eq!(statements[0], statements[2]);
    assert_eq!(statements[1], statements[3]);
    assert!(statements.iter().all(|s| s.contains("IF NOT EXISTS")));
}

#[tokio::test(start_paused = true)]
async fn ddl_failure_surfaces_as_query_failed() {
    let catalog = FakeCatalog::default();
    let waiter = QueryCompletionWaiter::default();
    let table = facilities();

    // A non-idempotent CREATE against an existing table fails on the service side.
    let create = "CREATE EXTERNAL TABLE healthcare_db.facilities (id string)".to_string();
    for _ in 0..2 {
        let handle = catalog.submit_query(&table.request(create.clone())).await.unwrap();
        let outcome = waiter
            .wait_outcome(&catalog, &handle, Duration::from_secs(30), None)
            .await
            .unwrap();
        if let WaitOutcome::Failed { reason, .. } = outcome {
            assert!(reason.starts_with("AlreadyExistsException"));
            return;
        }
    }
    panic!("second CREATE without IF NOT EXISTS should have failed");
}

#[tokio::test]
async fn invalid_table_name_never_reaches_the_service() {
    let catalog = FakeCatalog::default();
    let table = FacilityTable {
        table: "facilities;drop".into(),
        ..facilities()
    };

    let err = SchemaEnsurer::new(table, Duration::from_secs(30))
        .ensure(&catalog, &QueryCompletionWaiter::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AthenaError::Validation(_)));
    assert!(catalog.statements().is_empty());
}

#[tokio::test(start_paused = true)]
async fn aggregation_is_submitted_against_the_table() {
    let catalog = FakeCatalog::default();
    let handle = QuerySubmitter::new(facilities())
        .submit_aggregation(&catalog)
        .await
        .unwrap();

    assert_eq!(handle.as_str(), "exec-1");
    let sql = &catalog.statements()[0];
    assert!(sql.contains("FROM healthcare_db.facilities"));
    assert!(sql.contains("GROUP BY location.state"));
}
