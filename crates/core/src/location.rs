//! `s3://bucket/key` locations as used by Athena result configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A bucket plus an object key (or key prefix) in S3.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct S3Location {
    pub bucket: String,
    pub key: String,
}

impl S3Location {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse an `s3://bucket/key` URI. The key may be empty (`s3://bucket/`).
    pub fn parse(uri: &str) -> Result<Self, CoreError> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| CoreError::InvalidLocation(format!("missing s3:// scheme: {uri}")))?;

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(CoreError::InvalidLocation(format!("missing bucket: {uri}")));
        }

        Ok(Self::new(bucket, key))
    }

    /// Append `name` to this location's key, inserting a `/` when needed.
    pub fn join(&self, name: &str) -> Self {
        let key = if self.key.is_empty() || self.key.ends_with('/') {
            format!("{}{}", self.key, name)
        } else {
            format!("{}/{}", self.key, name)
        };
        Self::new(self.bucket.clone(), key)
    }
}

impl fmt::Display for S3Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}
