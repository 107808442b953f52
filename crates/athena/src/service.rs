//! The query-service seam: everything the pipeline needs from Athena.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AthenaError;
use crate::handle::QueryHandle;
use crate::result::QueryResultSet;
use crate::status::StatusReport;

/// A statement to submit, plus where it runs and where its results land.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    /// Execution-context database. Empty means the service default.
    pub database: String,
    /// `s3://` prefix for the result CSV and metadata.
    pub output_location: String,
    pub workgroup: String,
}

/// Operations against an external query-execution service.
///
/// Implemented over the AWS SDK by [`crate::AthenaClient`]; tests use the
/// scripted mock in [`crate::mock`].
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Start a query and return its handle without waiting for it.
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, AthenaError>;

    /// Fetch the current lifecycle state of a query.
    async fn get_query_status(&self, handle: &QueryHandle) -> Result<StatusReport, AthenaError>;

    /// Fetch one page (at most `page_size` rows) of a succeeded query's results.
    async fn get_query_results(
        &self,
        handle: &QueryHandle,
        page_size: u32,
    ) -> Result<QueryResultSet, AthenaError>;
}
