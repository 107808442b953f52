//! Bounded wait-for-completion over [`QueryService::get_query_status`].
//!
//! The waiter owns the decision loop that classifies a query's lifecycle:
//! it polls at a fixed interval until the query reaches a terminal state or
//! the wait budget runs out. There is no retry and no backoff; any fetch
//! error ends the wait immediately.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::AthenaError;
use crate::handle::QueryHandle;
use crate::service::QueryService;
use crate::status::{QueryStatus, StatusReport};

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(240);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(10);

/// Reported when a FAILED/CANCELLED query carries no state-change reason.
pub const UNKNOWN_REASON: &str = "Unknown error";

// ---------------------------------------------------------------------------
// Budget
// ---------------------------------------------------------------------------

/// How long a single wait may poll, fixed when the wait starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    limit: Duration,
}

impl WaitBudget {
    /// `min(max_wait, hint - margin)` when the caller passes its own remaining
    /// time, else `max_wait`. A hint at or below the margin leaves nothing.
    pub fn new(max_wait: Duration, remaining_hint: Option<Duration>, safety_margin: Duration) -> Self {
        let limit = match remaining_hint {
            Some(hint) => max_wait.min(hint.saturating_sub(safety_margin)),
            None => max_wait,
        };
        Self { limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// A zero budget times out before the first fetch.
    pub fn is_exhausted(&self) -> bool {
        self.limit.is_zero()
    }

    pub fn is_exceeded_by(&self, elapsed: Duration) -> bool {
        self.is_exhausted() || elapsed > self.limit
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// A query that reached SUCCEEDED.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCompletion {
    /// Status payload from the final poll.
    pub report: StatusReport,
    pub elapsed: Duration,
    /// Number of status fetches issued, including the final one.
    pub polls: u32,
}

/// How a wait ended, when it ended without a local error.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    Completed(QueryCompletion),
    TimedOut {
        elapsed: Duration,
        polls: u32,
    },
    /// FAILED or CANCELLED, with the service's reason or [`UNKNOWN_REASON`].
    Failed {
        status: QueryStatus,
        reason: String,
        elapsed: Duration,
    },
}

impl WaitOutcome {
    /// Collapse the non-success outcomes into typed errors.
    pub fn into_result(self, handle: &QueryHandle) -> Result<QueryCompletion, AthenaError> {
        match self {
            Self::Completed(completion) => Ok(completion),
            Self::TimedOut { elapsed, .. } => Err(AthenaError::QueryTimeout {
                query_id: handle.to_string(),
                elapsed_secs: elapsed.as_secs_f64(),
            }),
            Self::Failed { status, reason, .. } => Err(AthenaError::QueryFailed {
                query_id: handle.to_string(),
                status,
                reason,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Waiter
// ---------------------------------------------------------------------------

/// Polls a submitted query until it is SUCCEEDED, FAILED, CANCELLED, or out
/// of budget.
///
/// An optional shutdown token interrupts the poll sleep so a host shutdown
/// doesn't have to wait out the interval.
#[derive(Debug, Clone)]
pub struct QueryCompletionWaiter {
    poll_interval: Duration,
    safety_margin: Duration,
    shutdown: Option<CancellationToken>,
}

impl Default for QueryCompletionWaiter {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_SAFETY_MARGIN)
    }
}

impl QueryCompletionWaiter {
    pub fn new(poll_interval: Duration, safety_margin: Duration) -> Self {
        Self {
            poll_interval,
            safety_margin,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn budget(&self, max_wait: Duration, remaining_hint: Option<Duration>) -> WaitBudget {
        WaitBudget::new(max_wait, remaining_hint, self.safety_margin)
    }

    /// Wait and map TIMEOUT / FAILED / CANCELLED to [`AthenaError`].
    pub async fn wait(
        &self,
        service: &dyn QueryService,
        handle: &QueryHandle,
        max_wait: Duration,
        remaining_hint: Option<Duration>,
    ) -> Result<QueryCompletion, AthenaError> {
        self.wait_outcome(service, handle, max_wait, remaining_hint)
            .await?
            .into_result(handle)
    }

    /// Run the poll loop and report how it ended.
    ///
    /// `Err` is reserved for validation, transport, and shutdown; terminal
    /// query states and budget exhaustion come back as [`WaitOutcome`].
    pub async fn wait_outcome(
        &self,
        service: &dyn QueryService,
        handle: &QueryHandle,
        max_wait: Duration,
        remaining_hint: Option<Duration>,
    ) -> Result<WaitOutcome, AthenaError> {
        let start = Instant::now();
        let budget = self.budget(max_wait, remaining_hint);
        let mut polls: u32 = 0;

        if budget.is_exhausted() {
            warn!(
                query_id = %handle,
                max_wait_secs = max_wait.as_secs_f64(),
                remaining_secs = remaining_hint.map(|d| d.as_secs_f64()),
                "No time left to wait for query"
            );
            return Ok(WaitOutcome::TimedOut {
                elapsed: Duration::ZERO,
                polls,
            });
        }

        loop {
            let elapsed = start.elapsed();
            if budget.is_exceeded_by(elapsed) {
                warn!(
                    query_id = %handle,
                    elapsed_secs = elapsed.as_secs_f64(),
                    budget_secs = budget.limit().as_secs_f64(),
                    polls,
                    "Query timeout"
                );
                return Ok(WaitOutcome::TimedOut { elapsed, polls });
            }

            let report = match service.get_query_status(handle).await {
                Ok(report) => report,
                Err(e) => {
                    error!(query_id = %handle, error = %e, "Error checking query status");
                    return Err(e);
                }
            };
            polls += 1;

            match report.status {
                QueryStatus::Succeeded => {
                    info!(
                        query_id = %handle,
                        elapsed_secs = elapsed.as_secs_f64(),
                        polls,
                        "Query succeeded"
                    );
                    return Ok(WaitOutcome::Completed(QueryCompletion {
                        report,
                        elapsed,
                        polls,
                    }));
                }
                status if status.is_terminal() => {
                    let reason = report
                        .reason
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_REASON.to_string());
                    error!(
                        query_id = %handle,
                        state = %status,
                        reason = %reason,
                        "Query did not succeed"
                    );
                    return Ok(WaitOutcome::Failed {
                        status,
                        reason,
                        elapsed,
                    });
                }
                _ => {
                    info!(
                        query_id = %handle,
                        state = %report.status,
                        elapsed_secs = elapsed.as_secs_f64(),
                        "Query in progress"
                    );
                    self.sleep(handle).await?;
                }
            }
        }
    }

    async fn sleep(&self, handle: &QueryHandle) -> Result<(), AthenaError> {
        let Some(token) = &self.shutdown else {
            tokio::time::sleep(self.poll_interval).await;
            return Ok(());
        };

        tokio::select! {
            _ = token.cancelled() => {
                warn!(query_id = %handle, "Shutdown requested, abandoning wait");
                Err(AthenaError::Interrupted {
                    query_id: handle.to_string(),
                })
            }
            _ = tokio::time::sleep(self.poll_interval) => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
