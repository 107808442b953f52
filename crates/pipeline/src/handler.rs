//! Notification handler: one S3 event in, one response out.
//!
//! Each data file in the event runs the full chain in turn: ensure the table,
//! submit the aggregation, wait for it, publish the results. The first file
//! that fails aborts the invocation.

use std::sync::Arc;
use std::time::Duration;

use facility_athena::{
    FacilityTable, QueryCompletionWaiter, QueryService, QuerySubmitter, SchemaEnsurer,
};
use facility_core::Config;
use facility_storage::ObjectStorage;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::event::{ObjectRef, S3Event};
use crate::publisher::{PublishedResults, ResultPublisher};

const SUCCESS_MESSAGE: &str = "Processing completed successfully";

/// What the host knows about the current invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvocationContext {
    deadline: Option<Instant>,
}

impl InvocationContext {
    /// No host deadline: waits are bounded by their own timeouts only.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Deadline `timeout` from now. A timeout past what the clock can
    /// represent means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Time left before the host kills the invocation, if it has a deadline.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Lambda-style response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::from(SUCCESS_MESSAGE).to_string(),
        }
    }
}

/// The wired-up pipeline. Clients are built once by the host and shared.
pub struct FacilityPipeline {
    service: Arc<dyn QueryService>,
    storage: Arc<dyn ObjectStorage>,
    waiter: QueryCompletionWaiter,
    schema: SchemaEnsurer,
    submitter: QuerySubmitter,
    publisher: ResultPublisher,
    query_timeout: Duration,
}

impl FacilityPipeline {
    pub fn new(
        config: &Config,
        service: Arc<dyn QueryService>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        let table = FacilityTable {
            database: config.athena.database.clone(),
            table: config.athena.table.clone(),
            source_bucket: config.storage.source_bucket.clone(),
            output_location: config.athena_output_location(),
            workgroup: config.athena.workgroup.clone(),
        };
        let polling = &config.polling;

        Self {
            service,
            storage,
            waiter: QueryCompletionWaiter::new(polling.poll_interval(), polling.safety_margin()),
            schema: SchemaEnsurer::new(table.clone(), polling.ddl_timeout()),
            submitter: QuerySubmitter::new(table),
            publisher: ResultPublisher::new(
                config.storage.output_bucket.clone(),
                config.athena_output(),
                polling.result_page_size,
            ),
            query_timeout: polling.query_timeout(),
        }
    }

    /// Abandon in-flight waits when `token` fires.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.waiter = self.waiter.with_shutdown(token);
        self
    }

    /// Parse a raw notification payload and handle it.
    pub async fn handle_json(
        &self,
        payload: &str,
        ctx: &InvocationContext,
    ) -> Result<HandlerResponse, PipelineError> {
        let event = S3Event::from_json(payload)?;
        self.handle_event(&event, ctx).await
    }

    pub async fn handle_event(
        &self,
        event: &S3Event,
        ctx: &InvocationContext,
    ) -> Result<HandlerResponse, PipelineError> {
        for object in event.objects() {
            if !object.is_data_file() {
                info!(bucket = %object.bucket, key = %object.key, "Skipping non-JSON file");
                continue;
            }

            if let Err(e) = self.process_object(&object, ctx).await {
                error!(
                    bucket = %object.bucket,
                    key = %object.key,
                    error = %e,
                    "Error processing file"
                );
                return Err(e);
            }
        }

        Ok(HandlerResponse::success())
    }

    /// Run the whole chain for one data file.
    pub async fn process_object(
        &self,
        object: &ObjectRef,
        ctx: &InvocationContext,
    ) -> Result<PublishedResults, PipelineError> {
        info!("Processing file: s3://{}/{}", object.bucket, object.key);
        let service = self.service.as_ref();

        self.schema.ensure(service, &self.waiter).await?;

        let handle = self.submitter.submit_aggregation(service).await?;
        let completion = self
            .waiter
            .wait(service, &handle, self.query_timeout, ctx.remaining_time())
            .await?;

        let published = self
            .publisher
            .publish(service, self.storage.as_ref(), &handle, &completion, &object.key)
            .await?;

        info!(
            query_id = %handle,
            polls = completion.polls,
            elapsed_secs = completion.elapsed.as_secs_f64(),
            json_key = %published.json_key,
            "File processed"
        );
        Ok(published)
    }
}
