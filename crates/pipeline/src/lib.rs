pub mod error;
pub mod event;
pub mod handler;
pub mod publisher;

pub use error::PipelineError;
pub use event::{ObjectRef, S3Event};
pub use handler::{FacilityPipeline, HandlerResponse, InvocationContext};
pub use publisher::{ProcessedResults, PublishedResults, ResultPublisher};
