pub mod client;
pub mod error;
pub mod handle;
pub mod result;
pub mod schema;
pub mod service;
pub mod sql;
pub mod status;
pub mod submit;
pub mod waiter;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::AthenaClient;
pub use error::AthenaError;
pub use handle::QueryHandle;
pub use result::{QueryResultSet, Record, ResultColumn};
pub use schema::{FacilityTable, SchemaEnsurer};
pub use service::{QueryRequest, QueryService};
pub use status::{QueryStatus, StatusReport};
pub use submit::QuerySubmitter;
pub use waiter::{QueryCompletion, QueryCompletionWaiter, WaitBudget, WaitOutcome};
