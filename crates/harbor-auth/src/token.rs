//! Authorization-server wire contract
//!
//! Handles the three token endpoint interactions:
//! 1. Login / registration (initial credential exchange for a full grant)
//! 2. Token refresh (exchanging the refresh token for a new access token)
//!
//! All three POST JSON to the authorization server. `expires_in` is a delta
//! in seconds from the response time; the caller converts it to an absolute
//! unix millisecond timestamp when storing the pair
//! ([`crate::TokenPair::issued`]).

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Login endpoint path, relative to the API base URL.
pub const LOGIN_PATH: &str = "/auth/login";

/// Registration endpoint path.
pub const REGISTER_PATH: &str = "/auth/register";

/// Refresh endpoint path.
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// User credentials for login and registration.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

// Manual Debug so the password never lands in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Full grant returned by login and registration.
#[derive(Debug, Deserialize, Serialize)]
pub struct SessionGrant {
    pub success: bool,
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: u64,
}

/// Grant returned by the refresh endpoint.
///
/// The server either rotates the refresh token (new one in the response) or
/// lets the client keep using the old one (field absent).
#[derive(Debug, Deserialize, Serialize)]
pub struct RefreshGrant {
    pub success: bool,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Exchange credentials for a session grant via the login endpoint.
pub async fn login(
    client: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<SessionGrant> {
    session_grant(client, base_url, LOGIN_PATH, credentials, timeout).await
}

/// Register a new account; the server issues a grant on success.
pub async fn register(
    client: &reqwest::Client,
    base_url: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<SessionGrant> {
    session_grant(client, base_url, REGISTER_PATH, credentials, timeout).await
}

async fn session_grant(
    client: &reqwest::Client,
    base_url: &str,
    path: &str,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<SessionGrant> {
    let response = client
        .post(join_url(base_url, path))
        .timeout(timeout)
        .json(credentials)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    let grant = response
        .json::<SessionGrant>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid grant response: {e}")))?;

    if !grant.success {
        return Err(Error::InvalidResponse(
            "grant response did not indicate success".into(),
        ));
    }
    Ok(grant)
}

/// Refresh an access token using a refresh token.
///
/// Called only through the refresh coordinator, which guarantees at most one
/// exchange is in flight at a time.
pub async fn refresh(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
    timeout: Duration,
) -> Result<RefreshGrant> {
    let response = client
        .post(join_url(base_url, REFRESH_PATH))
        .timeout(timeout)
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Endpoint {
            status: status.as_u16(),
            body,
        });
    }

    let grant = response
        .json::<RefreshGrant>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("invalid refresh response: {e}")))?;

    if !grant.success {
        return Err(Error::InvalidResponse(
            "refresh response did not indicate success".into(),
        ));
    }
    Ok(grant)
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn request_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::TimedOut
    } else {
        Error::Http(format!("auth request failed: {err}"))
    }
}
