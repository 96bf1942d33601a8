//! Error types for account pool operations.

/// Errors from account pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("account pool store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("no ready account available")]
    NoReadyAccount,

    #[error("account not found: {0}")]
    NotFound(String),

    #[error("proxy file error: {0}")]
    ProxyFile(#[from] common::Error),
}

/// Result alias for account pool operations.
pub type Result<T> = std::result::Result<T, Error>;
