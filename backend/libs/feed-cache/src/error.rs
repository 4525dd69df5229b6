//! Cache error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache store unavailable: {0}")]
    Unavailable(String),
}

impl CacheError {
    /// Short label used for the `error_type` metric dimension
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Redis(_) => "redis",
            CacheError::Serialization(_) => "serialize",
            CacheError::Unavailable(_) => "unavailable",
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
