//! Error types for the dedupe store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupeError {
    #[error("dedupe store connection error: {0}")]
    Connection(String),

    #[error("dedupe store operation error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("dedupe store ping timed out after {0:?}")]
    PingTimeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, DedupeError>;
