//! Error types for the rate limiter.

/// Errors from rate limiter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("rate limiter store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("bucket name cannot be empty")]
    InvalidBucket,
}

/// Result alias for rate limiter operations.
pub type Result<T> = std::result::Result<T, Error>;
