//! Object-storage seam and its S3 implementation.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_types::SdkConfig;
use tracing::{debug, info};

use crate::error::StorageError;

/// The two object-store operations the pipeline performs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `body` to `bucket/key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Server-side copy of one object to another bucket/key.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError>;
}

/// `CopySource` value: bucket plus URL-encoded key, path separators kept.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

/// S3 backend over the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
}

impl S3Storage {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("(default)"),
            "Storage: S3 backend"
        );
        Self {
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let len = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Transport(DisplayErrorContext(&e).to_string()))?;

        debug!(bucket, key, bytes = len, "Object written");
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        let result = self
            .client
            .copy_object()
            .copy_source(copy_source(src_bucket, src_key))
            .bucket(dst_bucket)
            .key(dst_key)
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(src_bucket, src_key, dst_bucket, dst_key, "Object copied");
                Ok(())
            }
            Err(e) if e.raw_response().is_some_and(|r| r.status().as_u16() == 404) => {
                Err(StorageError::NotFound {
                    bucket: src_bucket.to_string(),
                    key: src_key.to_string(),
                })
            }
            Err(e) => Err(StorageError::Transport(DisplayErrorContext(&e).to_string())),
        }
    }
}
