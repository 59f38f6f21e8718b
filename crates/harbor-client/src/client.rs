//! The authenticated client and its response recovery policy
//!
//! One `AuthClient` wraps a reqwest client, the token store, the request
//! authorizer, and the refresh coordinator. For each submitted request it
//! decides whether a failed attempt is retried (after a shared token
//! refresh), surfaced as a typed error, or escalated to a session-expired
//! signal:
//!
//! - 401 on a not-yet-retried request: obtain a fresh token through the
//!   coordinator, re-run the authorizer, resubmit exactly once
//! - 401 on an already-retried request: terminal `AuthInvalid`
//! - refresh failure: terminal `AuthInvalid`; token state is already cleared
//!   and `SessionEvent::Expired` is broadcast — navigation is the shell's job
//! - no response at all: `Network`, never retried here
//! - other non-2xx: classified and returned with the server's envelope
//!   message; 5xx and 429 are additionally forwarded to the observability
//!   sink but not retried (idempotent-operation retry is the caller's call)

use std::sync::Arc;

use harbor_auth::{Credentials, TokenPair, TokenStore, token};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};

use crate::authorize::{RequestAuthorizer, new_request_id};
use crate::classify::{self, ErrorClass, TransportFailure};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::events::SessionEvent;
use crate::metrics;
use crate::refresh::RefreshCoordinator;
use crate::request::{ApiResponse, PendingRequest};

/// Authenticated HTTP client for the Harbor web API.
pub struct AuthClient {
    http: reqwest::Client,
    config: Config,
    store: Arc<TokenStore>,
    authorizer: RequestAuthorizer,
    coordinator: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthClient {
    /// Build a client over an explicitly constructed token store.
    ///
    /// The store is injected rather than global so tests and embedders can
    /// back it with anything implementing `TokenBackend`.
    pub fn new(config: Config, store: Arc<TokenStore>) -> Self {
        let http = reqwest::Client::new();
        let authorizer = RequestAuthorizer::new(
            store.clone(),
            config.expiry_skew(),
            config.api.client_version.clone(),
        );
        let coordinator = RefreshCoordinator::new(
            http.clone(),
            config.api.base_url.clone(),
            config.request_timeout(),
            config.expiry_skew(),
            store.clone(),
        );
        let (events, _) = broadcast::channel(16);
        Self {
            http,
            config,
            store,
            authorizer,
            coordinator,
            events,
        }
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Execute a request, transparently recovering from token expiry.
    ///
    /// A successful transparent refresh-and-retry is invisible to the caller;
    /// every other failure surfaces as a typed [`ApiError`]. Dropping the
    /// returned future cancels this request only — a token refresh it shares
    /// with other requests keeps running for them.
    pub async fn execute(&self, request: PendingRequest) -> Result<ApiResponse> {
        let request_id = new_request_id();
        self.run(request, request_id).await
    }

    #[instrument(skip_all, fields(request_id = %request_id, method = %request.method, path = %request.path))]
    async fn run(&self, mut request: PendingRequest, request_id: String) -> Result<ApiResponse> {
        loop {
            let headers = self.authorizer.apply(&request, &request_id).await;
            match self.send_once(&request, headers).await {
                Err(ApiError::AuthExpired { message }) => {
                    if request.retried {
                        warn!("request still unauthorized after refreshed credentials");
                        self.session_expired("request rejected after token refresh");
                        return Err(ApiError::AuthInvalid { message });
                    }
                    match self.coordinator.obtain_fresh_token().await {
                        Ok(_) => {
                            debug!("resubmitting with refreshed credentials");
                            request.retried = true;
                        }
                        Err(err) => {
                            // The coordinator already cleared local state
                            self.session_expired(&err.to_string());
                            return Err(ApiError::AuthInvalid {
                                message: err.to_string(),
                            });
                        }
                    }
                }
                outcome => return outcome,
            }
        }
    }

    /// Submit one attempt and classify its outcome.
    async fn send_once(
        &self,
        request: &PendingRequest,
        headers: reqwest::header::HeaderMap,
    ) -> Result<ApiResponse> {
        let url = format!(
            "{}{}",
            self.config.api.base_url.trim_end_matches('/'),
            request.path
        );
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers)
            .timeout(self.config.request_timeout());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let resp_headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(transport_error)?
            .to_vec();

        metrics::record_request(status.as_u16(), request.method.as_str());

        if status.as_u16() == 401 {
            let message =
                classify::extract_message(ErrorClass::Unauthorized, &String::from_utf8_lossy(&body));
            debug!("attempt came back unauthorized");
            return Err(ApiError::AuthExpired { message });
        }
        if status.is_success() {
            return Ok(ApiResponse {
                status,
                headers: resp_headers,
                body,
            });
        }
        Err(status_error(status.as_u16(), &String::from_utf8_lossy(&body)))
    }

    /// Exchange credentials for a session via the login endpoint.
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        let grant = token::login(
            &self.http,
            &self.config.api.base_url,
            credentials,
            self.config.request_timeout(),
        )
        .await
        .map_err(grant_error)?;
        self.install_grant(grant).await;
        Ok(())
    }

    /// Register a new account; the server issues a session on success.
    pub async fn register(&self, credentials: &Credentials) -> Result<()> {
        let grant = token::register(
            &self.http,
            &self.config.api.base_url,
            credentials,
            self.config.request_timeout(),
        )
        .await
        .map_err(grant_error)?;
        self.install_grant(grant).await;
        Ok(())
    }

    /// End the session, destroying all local token state.
    pub async fn logout(&self) {
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "failed to clear persisted tokens on logout");
        }
    }

    async fn install_grant(&self, grant: harbor_auth::SessionGrant) {
        let pair = TokenPair::issued(grant.access_token, grant.refresh_token, grant.expires_in);
        if let Err(e) = self.store.set(pair).await {
            // In-memory state is already current; the session works until restart
            warn!(error = %e, "failed to persist session tokens");
        }
    }

    fn session_expired(&self, reason: &str) {
        metrics::record_session_expired();
        warn!(reason, "session expired");
        let _ = self.events.send(SessionEvent::Expired {
            reason: reason.to_string(),
        });
    }
}

/// Map a failure that produced no HTTP response.
fn transport_error(err: reqwest::Error) -> ApiError {
    let failure = if err.is_timeout() {
        TransportFailure::TimedOut
    } else if err.is_connect() {
        TransportFailure::ConnectionFailed
    } else {
        TransportFailure::Other
    };
    match classify::classify_transport(failure) {
        ErrorClass::Cancelled => ApiError::Cancelled,
        _ => ApiError::Network {
            message: err.to_string(),
        },
    }
}

/// Map a non-2xx, non-401 status onto the error taxonomy, forwarding 5xx and
/// 429 outcomes to the observability sink.
fn status_error(status: u16, body: &str) -> ApiError {
    let class = classify::classify_status(status);
    let message = classify::extract_message(class, body);
    debug!(status, class = class.label(), "request failed upstream");
    match class {
        ErrorClass::RateLimited => {
            metrics::record_upstream_trouble(status);
            warn!(status, "upstream rate limited this client");
            ApiError::RateLimited { message }
        }
        ErrorClass::ServerError => {
            metrics::record_upstream_trouble(status);
            warn!(status, "upstream reported a server error");
            ApiError::ServerError { status, message }
        }
        _ => ApiError::ClientError { status, message },
    }
}

/// Map an authorization-server error from the login/register path.
fn grant_error(err: harbor_auth::Error) -> ApiError {
    match err {
        harbor_auth::Error::TimedOut => ApiError::Network {
            message: "request timed out".into(),
        },
        harbor_auth::Error::Http(message) => ApiError::Network { message },
        harbor_auth::Error::Endpoint { status, body } => status_error(status, &body),
        other => ApiError::ClientError {
            status: 200,
            message: other.to_string(),
        },
    }
}
