//! Error taxonomy shared between the health manager and the orchestrator.

/// The seven propagation-relevant error kinds a worker or probe can hit.
///
/// Defined once here so C3 (health manager) and C5 (orchestrator) dispatch
/// on identical semantics, per the shared-classification requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoReadyAccount,
    RateLimited,
    AuthDenied,
    TransientNetwork,
    StoreUnavailable,
    Cancelled,
    FatalConfig,
}

/// An error surfaced by a `ScrapeCollaborator` implementation.
#[derive(Debug, thiserror::Error)]
#[error("scrape error: {message}")]
pub struct ScrapeError {
    pub message: String,
    pub kind: Option<ErrorKind>,
}

impl ScrapeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: None,
        }
    }

    pub fn with_kind(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind: Some(kind),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
