use std::sync::Arc;

use facility_athena::mock::ScriptedQueryService;
use facility_athena::{QueryResultSet, QueryStatus, ResultColumn, StatusReport};
use facility_core::config::{AthenaConfig, AwsConfig, PollingConfig, StorageConfig};
use facility_core::Config;
use facility_pipeline::FacilityPipeline;
use facility_storage::mock::InMemoryStorage;

pub const SOURCE_BUCKET: &str = "medlaunch-assignment";
pub const OUTPUT_BUCKET: &str = "medlaunch-query-output";

pub fn config() -> Config {
    Config {
        profile: String::new(),
        aws: AwsConfig {
            region: "us-east-1".into(),
            endpoint_url: None,
        },
        storage: StorageConfig {
            source_bucket: SOURCE_BUCKET.into(),
            output_bucket: OUTPUT_BUCKET.into(),
        },
        athena: AthenaConfig {
            database: "healthcare_db".into(),
            table: "facilities".into(),
            workgroup: "primary".into(),
        },
        polling: PollingConfig::default(),
    }
}

/// Two states, one with a NULL employee total.
pub fn state_rows() -> QueryResultSet {
    QueryResultSet {
        columns: vec![
            ResultColumn::new("state", "varchar"),
            ResultColumn::new("facility_count", "bigint"),
            ResultColumn::new("total_employees", "bigint"),
        ],
        rows: vec![
            vec![Some("TX".into()), Some("3".into()), Some("420".into())],
            vec![Some("CA".into()), Some("1".into()), None],
        ],
        metadata: StatusReport::new("", QueryStatus::Succeeded),
    }
}

pub fn pipeline(
    service: &Arc<ScriptedQueryService>,
    storage: &Arc<InMemoryStorage>,
) -> FacilityPipeline {
    FacilityPipeline::new(&config(), service.clone(), storage.clone())
}

/// An S3 notification naming `keys` (already form-encoded) in the source bucket.
pub fn event_json(keys: &[&str]) -> String {
    let records: Vec<serde_json::Value> = keys
        .iter()
        .map(|key| {
            serde_json::json!({
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": SOURCE_BUCKET },
                    "object": { "key": key }
                }
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}
