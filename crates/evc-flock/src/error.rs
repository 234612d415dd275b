use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlockError {
    #[error("invalid flocking configuration: {0}")]
    Config(String),
}

pub type FlockResult<T> = Result<T, FlockError>;
