//! Authenticated HTTP client layer for the Harbor web API
//!
//! Wraps a reqwest client with bearer-token lifecycle management so the rest
//! of the application can issue API calls without thinking about token
//! expiry:
//!
//! 1. [`AuthClient::login`] / [`AuthClient::register`] exchange credentials
//!    for a token pair, stored through an injectable
//!    [`harbor_auth::TokenStore`]
//! 2. [`RequestAuthorizer`] attaches the bearer token (plus a correlation id
//!    and client-version tag) to each outgoing request
//! 3. On 401 the [`RefreshCoordinator`] performs a single-flight refresh
//!    exchange — concurrent requests all wait on the same exchange, which
//!    matters because the server may rotate the refresh token on use
//! 4. The failed request is resubmitted exactly once with the fresh token
//! 5. If the refresh itself fails, token state is cleared,
//!    [`SessionEvent::Expired`] is broadcast for the application shell, and
//!    the caller gets [`ApiError::AuthInvalid`]
//!
//! Everything else — page rendering, payments, CRUD models — lives outside
//! this layer and talks to it through [`AuthClient::execute`].

pub mod authorize;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod refresh;
pub mod request;

pub use authorize::RequestAuthorizer;
pub use classify::{ErrorClass, ErrorEnvelope, FieldError, TransportFailure};
pub use client::AuthClient;
pub use config::{Config, ConfigError};
pub use error::{ApiError, Result};
pub use events::SessionEvent;
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use request::{ApiResponse, PendingRequest};
