pub mod config;
pub mod error;
pub mod location;

pub use config::{Config, MAX_RESULT_PAGE_SIZE};
pub use error::CoreError;
pub use location::S3Location;
