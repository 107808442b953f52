//! S3 change notifications: just the fields the pipeline reads.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Suffixes of files that hold facility documents.
const DATA_SUFFIXES: &[&str] = &[".json", ".jsonl"];

/// A batch of S3 notification records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Event {
    #[serde(rename = "Records")]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Object {
    /// Key as delivered: form-URL-encoded.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A decoded `bucket/key` pair from one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    /// Whether the object is a facility data file we should process.
    pub fn is_data_file(&self) -> bool {
        DATA_SUFFIXES.iter().any(|suffix| self.key.ends_with(suffix))
    }
}

impl S3Event {
    pub fn from_json(payload: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(payload).map_err(|e| PipelineError::InvalidEvent(e.to_string()))
    }

    /// Decoded object references, in record order.
    pub fn objects(&self) -> Vec<ObjectRef> {
        self.records
            .iter()
            .map(|record| ObjectRef {
                bucket: record.s3.bucket.name.clone(),
                key: decode_key(&record.s3.object.key),
            })
            .collect()
    }
}

/// Undo S3's form encoding of object keys: `+` is a space, then `%XX` escapes.
/// Escapes that don't form valid UTF-8 become U+FFFD.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}
