use facility_athena::AthenaError;
use facility_storage::StorageError;

/// Errors that fail a pipeline invocation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The notification payload could not be understood.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Athena(#[from] AthenaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
