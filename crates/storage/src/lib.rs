pub mod backend;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use backend::{copy_source, ObjectStorage, S3Storage};
pub use error::StorageError;
