use crate::status::QueryStatus;

/// Errors that can occur during query-service operations.
#[derive(Debug, thiserror::Error)]
pub enum AthenaError {
    /// Bad input: malformed query handle, identifier, or a request the
    /// service rejected as invalid. Never retried.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The wait budget ran out before the query reached a terminal state.
    #[error("Query execution timeout: {query_id} (after {elapsed_secs:.1}s)")]
    QueryTimeout { query_id: String, elapsed_secs: f64 },

    /// The query ended FAILED or CANCELLED on the service side.
    #[error("Query {query_id} {status}: {reason}")]
    QueryFailed {
        query_id: String,
        status: QueryStatus,
        reason: String,
    },

    /// Any other failure talking to the service (stringified SDK error).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The host asked us to stop while a wait was in flight.
    #[error("Wait for query {query_id} interrupted by shutdown")]
    Interrupted { query_id: String },

    /// Failed to interpret a service response.
    #[error("Parse error: {0}")]
    Parse(String),
}
