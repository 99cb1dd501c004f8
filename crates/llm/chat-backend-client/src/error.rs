use dbot_core::DbotError;
use thiserror::Error;

/// Failure of one backend call. Every variant maps to a [`BackendErrorKind`] that keys the
/// failure policy table.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("RateLimitError: rate limit exceeded")]
    RateLimitExceeded,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Bad gateway: backend returned status {status}")]
    Gateway { status: u16 },

    #[error("Failed to read backend response: {0}")]
    Decode(String),

    #[error("Session has no turns")]
    EmptySession,

    #[error("Backend error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    RateLimit,
    Timeout,
    Gateway,
    Connection,
    Other,
}

impl BackendError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::RateLimitExceeded => BackendErrorKind::RateLimit,
            BackendError::Timeout(_) => BackendErrorKind::Timeout,
            BackendError::Connection(_) => BackendErrorKind::Connection,
            BackendError::Gateway { .. } => BackendErrorKind::Gateway,
            BackendError::Decode(_) | BackendError::EmptySession | BackendError::Other(_) => {
                BackendErrorKind::Other
            }
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout(e.to_string())
        } else if e.is_connect() {
            BackendError::Connection(e.to_string())
        } else if let Some(status) = e.status() {
            BackendError::Gateway {
                status: status.as_u16(),
            }
        } else if e.is_body() || e.is_decode() {
            BackendError::Decode(e.to_string())
        } else {
            BackendError::Other(e.to_string())
        }
    }
}

impl From<BackendError> for DbotError {
    fn from(e: BackendError) -> Self {
        DbotError::Backend(e.to_string())
    }
}
