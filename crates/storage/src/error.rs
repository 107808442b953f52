use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Any failure talking to the object store (stringified SDK error).
    #[error("object store error: {0}")]
    Transport(String),

    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },
}
