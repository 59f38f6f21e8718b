//! Request decoration with session credentials and tracing headers
//!
//! The authorizer only reads the token store; it never refreshes. If the
//! stored access token is missing or inside the expiry skew window, the
//! request goes out unauthenticated and the recovery policy handles the
//! resulting 401 reactively — one guaranteed-dead round trip is cheaper than
//! a proactive refresh on every page load.

use std::sync::Arc;
use std::time::Duration;

use harbor_auth::TokenStore;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::request::PendingRequest;

/// Correlation id header attached to every request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client version header attached to every request.
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

/// Decorates outgoing requests with the current bearer token plus a
/// correlation id and client-version tag. The tracing headers have no effect
/// on authorization logic.
pub struct RequestAuthorizer {
    store: Arc<TokenStore>,
    skew: Duration,
    client_version: String,
}

impl RequestAuthorizer {
    pub fn new(store: Arc<TokenStore>, skew: Duration, client_version: String) -> Self {
        Self {
            store,
            skew,
            client_version,
        }
    }

    /// Build the headers for one submission attempt.
    ///
    /// `request_id` is generated once per logical request by the client, so
    /// the transparent retry carries the same correlation id as the attempt
    /// that triggered it. A caller-supplied `Authorization` header is never
    /// overwritten.
    pub async fn apply(&self, request: &PendingRequest, request_id: &str) -> HeaderMap {
        let mut headers = request.headers.clone();

        if headers.contains_key(AUTHORIZATION) {
            debug!("request carries its own authorization header, leaving it untouched");
        } else if let Some(pair) = self.store.get().await {
            if self.store.is_expired(self.skew).await {
                debug!("stored access token expired, sending request unauthenticated");
            } else {
                match HeaderValue::from_str(&format!("Bearer {}", pair.access_token)) {
                    Ok(value) => {
                        headers.insert(AUTHORIZATION, value);
                    }
                    Err(e) => {
                        warn!(error = %e, "stored access token is not a valid header value");
                    }
                }
            }
        }

        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        match HeaderValue::from_str(&self.client_version) {
            Ok(value) => {
                headers.insert(HeaderName::from_static(CLIENT_VERSION_HEADER), value);
            }
            Err(e) => {
                warn!(error = %e, "configured client version is not a valid header value");
            }
        }

        headers
    }
}

/// Generate a fresh correlation id.
pub fn new_request_id() -> String {
    format!("req_{}", uuid::Uuid::new_v4().as_simple())
}
