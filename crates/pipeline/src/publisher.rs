//! Republishes a succeeded query's results to the output bucket.
//!
//! The JSON document is the deliverable; the CSV copy is a convenience and
//! its failure never fails the pipeline.

use chrono::{DateTime, Utc};
use facility_athena::{QueryCompletion, QueryHandle, QueryService, Record, StatusReport};
use facility_core::S3Location;
use facility_storage::ObjectStorage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PipelineError;

const JSON_CONTENT_TYPE: &str = "application/json";
const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// The JSON document written to `processed-results/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResults {
    pub query_execution_id: String,
    /// Key of the data file that triggered the run.
    pub source_file: String,
    /// UTC, ISO-8601 without offset.
    pub execution_time: String,
    pub result_count: usize,
    pub results: Vec<Record>,
}

/// Where a publish run wrote things.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedResults {
    pub json_key: String,
    /// `None` when the best-effort CSV copy failed.
    pub csv_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResultPublisher {
    output_bucket: String,
    /// Prefix Athena writes `{query_id}.csv` under.
    athena_output: S3Location,
    page_size: u32,
}

impl ResultPublisher {
    pub fn new(output_bucket: impl Into<String>, athena_output: S3Location, page_size: u32) -> Self {
        Self {
            output_bucket: output_bucket.into(),
            athena_output,
            page_size,
        }
    }

    pub async fn publish(
        &self,
        service: &dyn QueryService,
        storage: &dyn ObjectStorage,
        handle: &QueryHandle,
        completion: &QueryCompletion,
        source_key: &str,
    ) -> Result<PublishedResults, PipelineError> {
        self.publish_at(service, storage, handle, completion, source_key, Utc::now())
            .await
    }

    /// [`publish`](Self::publish) with an explicit clock, for stable keys.
    pub async fn publish_at(
        &self,
        service: &dyn QueryService,
        storage: &dyn ObjectStorage,
        handle: &QueryHandle,
        completion: &QueryCompletion,
        source_key: &str,
        now: DateTime<Utc>,
    ) -> Result<PublishedResults, PipelineError> {
        let results = service.get_query_results(handle, self.page_size).await?;
        debug!(
            query_id = %handle,
            rows = results.row_count(),
            bytes_scanned = results.metadata.bytes_scanned,
            "Query results fetched"
        );
        let records = results.to_records();

        let document = ProcessedResults {
            query_execution_id: handle.to_string(),
            source_file: source_key.to_string(),
            execution_time: execution_time(now),
            result_count: records.len(),
            results: records,
        };

        let json_key = json_output_key(source_key, now);
        let body = serde_json::to_vec_pretty(&document)?;
        storage
            .put_object(&self.output_bucket, &json_key, body, JSON_CONTENT_TYPE)
            .await?;

        info!(
            query_id = %handle,
            rows = document.result_count,
            "Results stored: s3://{}/{}",
            self.output_bucket,
            json_key
        );

        // Prefer the location reported with the results, then the one from the wait.
        let report = if results.metadata.output_location.is_some() {
            &results.metadata
        } else {
            &completion.report
        };
        let csv_key = self.copy_csv(storage, handle, report, now).await;

        Ok(PublishedResults { json_key, csv_key })
    }

    /// Where Athena left the result CSV for this query.
    pub fn csv_source(&self, handle: &QueryHandle, report: &StatusReport) -> S3Location {
        if let Some(location) = &report.output_location {
            match S3Location::parse(location) {
                Ok(loc) => return loc,
                Err(e) => warn!(query_id = %handle, error = %e, "Ignoring reported output location"),
            }
        }
        self.athena_output.join(&format!("{handle}.csv"))
    }

    /// Best-effort: logs and swallows any failure.
    async fn copy_csv(
        &self,
        storage: &dyn ObjectStorage,
        handle: &QueryHandle,
        report: &StatusReport,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let source = self.csv_source(handle, report);
        let dest_key = csv_output_key(now);

        match storage
            .copy_object(&source.bucket, &source.key, &self.output_bucket, &dest_key)
            .await
        {
            Ok(()) => {
                info!(query_id = %handle, "CSV copied: s3://{}/{}", self.output_bucket, dest_key);
                Some(dest_key)
            }
            Err(e) => {
                warn!(query_id = %handle, source = %source, error = %e, "Could not copy CSV");
                None
            }
        }
    }
}

/// ISO-8601 without offset; microseconds only when non-zero.
pub fn execution_time(now: DateTime<Utc>) -> String {
    if now.timestamp_subsec_micros() == 0 {
        now.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

/// `processed-results/{timestamp}-{file name of source_key}`.
pub fn json_output_key(source_key: &str, now: DateTime<Utc>) -> String {
    let file_name = source_key.rsplit('/').next().unwrap_or(source_key);
    format!(
        "processed-results/{}-{}",
        now.format(KEY_TIMESTAMP_FORMAT),
        file_name
    )
}

/// `csv-results/{timestamp}-results.csv`.
pub fn csv_output_key(now: DateTime<Utc>) -> String {
    format!("csv-results/{}-results.csv", now.format(KEY_TIMESTAMP_FORMAT))
}
