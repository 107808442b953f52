//! AWS Athena implementation of [`QueryService`].
//!
//! Every call is a single SDK request: no retries beyond what the SDK's own
//! retry layer does, no client-side backoff. `InvalidRequestException` maps
//! to [`AthenaError::Validation`]; every other SDK failure maps to
//! [`AthenaError::Transport`].

use async_trait::async_trait;
use aws_sdk_athena::error::SdkError;
use aws_sdk_athena::operation::get_query_results::GetQueryResultsOutput;
use aws_sdk_athena::types::{
    EncryptionConfiguration, EncryptionOption, QueryExecution, QueryExecutionContext,
    ResultConfiguration,
};
use aws_types::SdkConfig;
use tracing::{debug, info};

use crate::error::AthenaError;
use crate::handle::QueryHandle;
use crate::result::{QueryResultSet, ResultColumn};
use crate::service::{QueryRequest, QueryService};
use crate::status::{QueryStatus, StatusReport};

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Operation errors that can tell us the request itself was rejected.
trait InvalidRequest {
    fn is_invalid_request(&self) -> bool;
}

macro_rules! invalid_request_for {
    ($($err:ty),* $(,)?) => {
        $(impl InvalidRequest for $err {
            fn is_invalid_request(&self) -> bool {
                self.is_invalid_request_exception()
            }
        })*
    };
}

invalid_request_for!(
    aws_sdk_athena::operation::start_query_execution::StartQueryExecutionError,
    aws_sdk_athena::operation::get_query_execution::GetQueryExecutionError,
    aws_sdk_athena::operation::get_query_results::GetQueryResultsError,
);

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> AthenaError
where
    E: InvalidRequest + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = aws_sdk_athena::error::DisplayErrorContext(&err).to_string();
    match err.as_service_error() {
        Some(service_err) if service_err.is_invalid_request() => AthenaError::Validation(message),
        _ => AthenaError::Transport(message),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for executing queries against AWS Athena.
///
/// Constructed once by the host from a shared [`SdkConfig`] and handed to the
/// pipeline components; it holds no per-query state.
#[derive(Debug, Clone)]
pub struct AthenaClient {
    athena_client: aws_sdk_athena::Client,
}

impl AthenaClient {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        let athena_client = aws_sdk_athena::Client::new(sdk_config);
        info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("(default)"),
            "AthenaClient initialised"
        );
        Self { athena_client }
    }

    /// Build a [`StatusReport`] from an SDK [`QueryExecution`].
    fn status_report(query_id: &str, qe: &QueryExecution) -> StatusReport {
        let stats = qe.statistics();
        let status = qe.status();

        StatusReport {
            query_id: query_id.to_string(),
            status: status
                .and_then(|s| s.state())
                .map(QueryStatus::from)
                .unwrap_or(QueryStatus::Pending),
            reason: status
                .and_then(|s| s.state_change_reason())
                .map(str::to_string),
            bytes_scanned: stats
                .and_then(|s| s.data_scanned_in_bytes())
                .unwrap_or(0)
                .max(0) as u64,
            execution_time_ms: stats
                .and_then(|s| s.engine_execution_time_in_millis())
                .unwrap_or(0)
                .max(0) as u64,
            output_location: qe
                .result_configuration()
                .and_then(|rc| rc.output_location())
                .map(str::to_string),
        }
    }

    /// Parse the raw SDK [`GetQueryResultsOutput`] into a [`QueryResultSet`].
    ///
    /// Athena returns column metadata in `ResultSetMetadata` and data rows in
    /// `ResultSet.Rows`. When `UpdateCount` is `None` the first row duplicates
    /// the column headers and must be skipped.
    fn parse_results(
        output: &GetQueryResultsOutput,
        metadata: StatusReport,
    ) -> Result<QueryResultSet, AthenaError> {
        let result_set = output
            .result_set()
            .ok_or_else(|| AthenaError::Parse("No ResultSet in response".into()))?;

        let columns: Vec<ResultColumn> = result_set
            .result_set_metadata()
            .map(|meta| {
                meta.column_info()
                    .iter()
                    .map(|ci| {
                        ResultColumn::new(ci.label().unwrap_or(ci.name()), ci.r#type())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let raw_rows = result_set.rows();
        let skip = if output.update_count().is_none() && !raw_rows.is_empty() {
            1
        } else {
            0
        };

        let rows: Vec<Vec<Option<String>>> = raw_rows
            .iter()
            .skip(skip)
            .map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect()
            })
            .collect();

        debug!(
            columns = columns.len(),
            rows = rows.len(),
            query_id = %metadata.query_id,
            "Parsed Athena results"
        );

        Ok(QueryResultSet {
            columns,
            rows,
            metadata,
        })
    }
}

#[async_trait]
impl QueryService for AthenaClient {
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, AthenaError> {
        let encryption = EncryptionConfiguration::builder()
            .encryption_option(EncryptionOption::SseS3)
            .build()
            .map_err(|e| AthenaError::Validation(e.to_string()))?;

        let mut context = QueryExecutionContext::builder();
        if !request.database.is_empty() {
            context = context.database(&request.database);
        }

        let resp = self
            .athena_client
            .start_query_execution()
            .query_string(&request.sql)
            .query_execution_context(context.build())
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&request.output_location)
                    .encryption_configuration(encryption)
                    .build(),
            )
            .work_group(&request.workgroup)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let query_id = resp
            .query_execution_id()
            .ok_or_else(|| AthenaError::Parse("No query execution ID returned".into()))?;

        info!(query_id = %query_id, "Query execution started");
        QueryHandle::new(query_id)
    }

    async fn get_query_status(&self, handle: &QueryHandle) -> Result<StatusReport, AthenaError> {
        let resp = self
            .athena_client
            .get_query_execution()
            .query_execution_id(handle.as_str())
            .send()
            .await
            .map_err(map_sdk_error)?;

        let qe = resp
            .query_execution()
            .ok_or_else(|| AthenaError::Parse("No query execution in response".into()))?;

        Ok(Self::status_report(handle.as_str(), qe))
    }

    async fn get_query_results(
        &self,
        handle: &QueryHandle,
        page_size: u32,
    ) -> Result<QueryResultSet, AthenaError> {
        // Results carry the final status so the publisher knows the CSV location.
        let metadata = self.get_query_status(handle).await?;

        let output = self
            .athena_client
            .get_query_results()
            .query_execution_id(handle.as_str())
            .max_results(page_size.clamp(1, 1000) as i32)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Self::parse_results(&output, metadata)
    }
}

// ---------------------------------------------------------------------------
// Tests: parsing logic only, no AWS calls
// ---------------------------------------------------------------------------
