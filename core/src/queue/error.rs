//! Work Queue error types.

use thiserror::Error;

/// Result alias for Work Queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors produced by the Work Queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The underlying Redis connection or command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// An envelope pulled from the queue could not be deserialized.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

impl QueueError {
    /// Whether this is a connectivity-level failure, as opposed to a
    /// data-shape problem.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}
