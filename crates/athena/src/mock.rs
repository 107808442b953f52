//! Scripted [`QueryService`] for tests: no AWS calls.
//!
//! Status polls are answered from a queue; the last queued status repeats
//! once the queue is down to one entry, so "never finishes" is a single
//! `RUNNING`. Every call is recorded along with the (tokio) time it was made,
//! which lets paused-clock tests assert nothing was fetched past a deadline.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::AthenaError;
use crate::handle::QueryHandle;
use crate::result::QueryResultSet;
use crate::service::{QueryRequest, QueryService};
use crate::status::{QueryStatus, StatusReport};

/// A canned answer to `get_query_status`.
#[derive(Debug, Clone)]
pub enum ScriptedStatus {
    Report(QueryStatus, Option<String>),
    /// Fail the fetch itself.
    Error(String),
    /// Fail the fetch as an invalid request.
    Invalid(String),
}

#[derive(Default)]
struct State {
    next_id: u32,
    statuses: VecDeque<ScriptedStatus>,
    results: Option<QueryResultSet>,
    submit_error: Option<String>,
    output_location: Option<String>,
    submitted: Vec<QueryRequest>,
    status_calls: Vec<(QueryHandle, Instant)>,
    result_calls: Vec<(QueryHandle, u32)>,
}

/// Test double for the query service.
#[derive(Default)]
pub struct ScriptedQueryService {
    state: Mutex<State>,
}

impl ScriptedQueryService {
    /// Every query succeeds on its first poll and returns no rows.
    pub fn new() -> Self {
        Self::with_statuses([QueryStatus::Succeeded])
    }

    pub fn with_statuses(statuses: impl IntoIterator<Item = QueryStatus>) -> Self {
        let svc = Self::default();
        for s in statuses {
            svc.push_status(s, None);
        }
        svc
    }

    pub fn push_status(&self, status: QueryStatus, reason: Option<&str>) {
        self.lock()
            .statuses
            .push_back(ScriptedStatus::Report(status, reason.map(str::to_string)));
    }

    pub fn push_error(&self, message: &str) {
        self.lock()
            .statuses
            .push_back(ScriptedStatus::Error(message.to_string()));
    }

    pub fn push_invalid(&self, message: &str) {
        self.lock()
            .statuses
            .push_back(ScriptedStatus::Invalid(message.to_string()));
    }

    /// Result page returned by `get_query_results` (metadata id is rewritten).
    pub fn set_results(&self, results: QueryResultSet) {
        self.lock().results = Some(results);
    }

    /// Make every `submit_query` fail with a transport error.
    pub fn fail_submissions(&self, message: &str) {
        self.lock().submit_error = Some(message.to_string());
    }

    /// Output location reported in status payloads.
    pub fn set_output_location(&self, location: &str) {
        self.lock().output_location = Some(location.to_string());
    }

    pub fn submitted(&self) -> Vec<QueryRequest> {
        self.lock().submitted.clone()
    }

    pub fn submitted_sql(&self) -> Vec<String> {
        self.lock().submitted.iter().map(|r| r.sql.clone()).collect()
    }

    pub fn status_call_count(&self) -> usize {
        self.lock().status_calls.len()
    }

    /// Instants at which status fetches were issued.
    pub fn status_call_times(&self) -> Vec<Instant> {
        self.lock().status_calls.iter().map(|(_, at)| *at).collect()
    }

    pub fn result_calls(&self) -> Vec<(QueryHandle, u32)> {
        self.lock().result_calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl QueryService for ScriptedQueryService {
    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryHandle, AthenaError> {
        let mut state = self.lock();
        if let Some(message) = &state.submit_error {
            return Err(AthenaError::Transport(message.clone()));
        }
        state.next_id += 1;
        state.submitted.push(request.clone());
        QueryHandle::new(format!("q-{}", state.next_id))
    }

    async fn get_query_status(&self, handle: &QueryHandle) -> Result<StatusReport, AthenaError> {
        let mut state = self.lock();
        state.status_calls.push((handle.clone(), Instant::now()));

        let scripted = if state.statuses.len() > 1 {
            state.statuses.pop_front()
        } else {
            state.statuses.front().cloned()
        };

        match scripted {
            Some(ScriptedStatus::Report(status, reason)) => Ok(StatusReport {
                reason,
                output_location: state.output_location.clone(),
                ..StatusReport::new(handle.as_str(), status)
            }),
            Some(ScriptedStatus::Error(message)) => Err(AthenaError::Transport(message)),
            Some(ScriptedStatus::Invalid(message)) => Err(AthenaError::Validation(message)),
            None => Ok(StatusReport::new(handle.as_str(), QueryStatus::Succeeded)),
        }
    }

    async fn get_query_results(
        &self,
        handle: &QueryHandle,
        page_size: u32,
    ) -> Result<QueryResultSet, AthenaError> {
        let mut state = self.lock();
        state.result_calls.push((handle.clone(), page_size));

        let mut results = state.results.clone().unwrap_or_else(|| QueryResultSet {
            columns: Vec::new(),
            rows: Vec::new(),
            metadata: StatusReport::new(handle.as_str(), QueryStatus::Succeeded),
        });
        results.metadata.query_id = handle.to_string();
        results.metadata.output_location = state.output_location.clone();
        results.rows.truncate(page_size as usize);
        Ok(results)
    }
}
