//! In-memory [`ObjectStorage`] for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::backend::ObjectStorage;
use crate::error::StorageError;

/// A stored object: body plus content type.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Objects keyed by `(bucket, key)`; optionally fails every write or copy.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    fail_puts: Mutex<Option<String>>,
    fail_copies: Mutex<Option<String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, e.g. the CSV Athena would have written.
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.into(),
                content_type: None,
            },
        );
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys under `prefix` in `bucket`, sorted.
    pub fn keys(&self, bucket: &str, prefix: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn fail_puts(&self, message: &str) {
        *self.fail_puts.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_copies(&self, message: &str) {
        *self.fail_copies.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if let Some(message) = self.fail_puts.lock().unwrap().clone() {
            return Err(StorageError::Transport(message));
        }
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
            },
        );
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), StorageError> {
        if let Some(message) = self.fail_copies.lock().unwrap().clone() {
            return Err(StorageError::Transport(message));
        }
        let mut objects = self.objects.lock().unwrap();
        let source = objects
            .get(&(src_bucket.to_string(), src_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: src_bucket.to_string(),
                key: src_key.to_string(),
            })?;
        objects.insert((dst_bucket.to_string(), dst_key.to_string()), source);
        Ok(())
    }
}
