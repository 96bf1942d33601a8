//! Error types for job scheduler operations.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("job checkpoint store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("job state file error: {0}")]
    StateFile(#[from] common::Error),

    #[error("job not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
