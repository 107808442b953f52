use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid S3 location: {0}")]
    InvalidLocation(String),
}
