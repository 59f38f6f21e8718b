//! Caller-facing error taxonomy
//!
//! Recoverable token expiry (`AuthExpired`) is absorbed by the transparent
//! refresh-and-retry path in [`crate::AuthClient::execute`]; callers only ever
//! see the terminal classes. Every variant carries the server-provided
//! envelope message when one was available.

use thiserror::Error;

/// Errors returned by the authenticated client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The access token was rejected on a not-yet-retried request.
    /// Recoverable: the client refreshes and resubmits, so this variant never
    /// surfaces from `execute` — it either disappears into a successful retry
    /// or becomes `AuthInvalid`.
    #[error("access token expired: {message}")]
    AuthExpired { message: String },

    /// The refresh itself was rejected, or the retried request was still
    /// unauthorized. Terminal; accompanied by a session-expired signal.
    #[error("session is no longer valid: {message}")]
    AuthInvalid { message: String },

    /// No HTTP response was received (connection failure, timeout).
    #[error("network failure: {message}")]
    Network { message: String },

    /// Upstream returned 429.
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    /// Upstream returned a 5xx status.
    #[error("server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Upstream returned another 4xx (or otherwise unexpected) status.
    #[error("request failed ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// The caller aborted the request.
    #[error("request cancelled")]
    Cancelled,
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
