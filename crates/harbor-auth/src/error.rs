//! Error types for token storage and authorization-server operations

/// Errors from token storage and authorization-server operations.
///
/// `Clone` because a refresh outcome is fanned out to every caller waiting
/// on the same in-flight exchange.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out")]
    TimedOut,

    #[error("auth endpoint returned {status}: {body}")]
    Endpoint { status: u16, body: String },

    #[error("invalid auth response: {0}")]
    InvalidResponse(String),

    #[error("token state parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
