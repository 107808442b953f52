use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AthenaError;

/// Athena rejects execution ids longer than this.
const MAX_HANDLE_LEN: usize = 128;

/// Opaque identifier of a submitted query (Athena's `QueryExecutionId`).
///
/// Construction validates the id, so every handle a waiter sees is well formed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueryHandle(String);

impl QueryHandle {
    pub fn new(id: impl Into<String>) -> Result<Self, AthenaError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AthenaError::Validation("empty query handle".into()));
        }
        if id.len() > MAX_HANDLE_LEN {
            return Err(AthenaError::Validation(format!(
                "query handle longer than {MAX_HANDLE_LEN} characters"
            )));
        }
        if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AthenaError::Validation(format!(
                "query handle contains whitespace or control characters: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueryHandle {
    type Error = AthenaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QueryHandle> for String {
    fn from(handle: QueryHandle) -> Self {
        handle.0
    }
}

impl AsRef<str> for QueryHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
