//! Shared error taxonomy (spec §7), used by both HTTP services to build
//! their own `IntoResponse` impls without duplicating the kind/status
//! mapping.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// HTTP status code per spec §7. Kept here (not in an axum-specific
    /// impl) so non-HTTP callers (the provider's stream handler) can reuse
    /// the same classification.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::NotFound(_) => 404,
            Error::PreconditionFailed(_) => 400,
            Error::RateLimited => 429,
            Error::Unavailable(_) => 503,
            Error::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
