//! Query lifecycle states and the status payload returned by a poll.

use std::fmt;

use aws_sdk_athena::types::QueryExecutionState;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a submitted query, as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryStatus {
    /// `true` for states from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&QueryExecutionState> for QueryStatus {
    /// `QUEUED` and any state this SDK version doesn't know about are
    /// treated as pending, so the waiter keeps polling.
    fn from(state: &QueryExecutionState) -> Self {
        match state {
            QueryExecutionState::Running => Self::Running,
            QueryExecutionState::Succeeded => Self::Succeeded,
            QueryExecutionState::Failed => Self::Failed,
            QueryExecutionState::Cancelled => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

/// Snapshot of a query execution returned by one status fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Athena query execution ID.
    pub query_id: String,
    pub status: QueryStatus,
    /// Service-provided explanation for the last state change, if any.
    pub reason: Option<String>,
    /// Total bytes scanned so far.
    pub bytes_scanned: u64,
    /// Engine execution time in milliseconds.
    pub execution_time_ms: u64,
    /// S3 location of the result CSV, if the service reported one.
    pub output_location: Option<String>,
}

impl StatusReport {
    /// Minimal report carrying only an id and a state.
    pub fn new(query_id: impl Into<String>, status: QueryStatus) -> Self {
        Self {
            query_id: query_id.into(),
            status,
            reason: None,
            bytes_scanned: 0,
            execution_time_ms: 0,
            output_location: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_output_location(mut self, location: impl Into<String>) -> Self {
        self.output_location = Some(location.into());
        self
    }
}
