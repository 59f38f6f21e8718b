//! Single-flight token refresh
//!
//! Any number of requests can discover an expired or rejected access token at
//! the same time. The authorization server may rotate the refresh token on
//! each use, so two parallel exchanges with the same pre-rotation refresh
//! token would race: the loser gets a revoked-token error and would wrongly
//! force a full logout. The coordinator therefore guarantees at most one
//! exchange is in flight at a time; every caller that arrives while it runs
//! receives the same outcome.
//!
//! Flight slot states:
//! - idle: slot is `None`; the first caller installs a watch channel and
//!   spawns the exchange task
//! - in flight: slot is `Some(receiver)`, channel value still `None`; callers
//!   clone the receiver and wait
//! - resolved: the exchange task returns the slot to `None`, then publishes
//!   `Some(outcome)` — a broadcast that releases every waiter together
//!
//! The token store is updated (success) or cleared (failure) *before* the
//! outcome is published, so a waiter that immediately re-reads the store sees
//! the post-exchange state. The check-and-set of the slot happens entirely
//! under its mutex, with no suspension point inside. The exchange runs on its
//! own spawned task: a caller that is cancelled while waiting only drops its
//! receiver clone and cannot abort the exchange for the other waiters.
//!
//! A failed exchange — rejection, timeout, transport error, or an unusable
//! response — is terminal for the session: the store is cleared, every waiter
//! gets the same failure, and the coordinator never retries on its own.

use std::sync::Arc;
use std::time::Duration;

use harbor_auth::{Error, TokenPair, TokenStore, token};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::metrics;

/// Result of a refresh exchange, shared by every concurrent caller.
pub type RefreshOutcome = Result<TokenPair, Error>;

type FlightSlot = Option<watch::Receiver<Option<RefreshOutcome>>>;

/// Coordinates refresh exchanges so at most one is in flight at a time.
///
/// The sole writer of the token store on the request path: `set` on a
/// successful exchange, `clear` on a failed one. Everything else only reads.
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    skew: Duration,
    flight: Arc<Mutex<FlightSlot>>,
}

impl RefreshCoordinator {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        timeout: Duration,
        skew: Duration,
        store: Arc<TokenStore>,
    ) -> Self {
        Self {
            store,
            client,
            base_url,
            timeout,
            skew,
            flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Obtain a fresh token pair, joining the in-flight exchange if one exists.
    ///
    /// Callable concurrently from arbitrarily many requests; exactly one
    /// network exchange runs regardless of caller count. Any error is
    /// terminal: the store has already been cleared and the session must be
    /// re-established through login.
    pub async fn obtain_fresh_token(&self) -> RefreshOutcome {
        let mut rx = {
            // Check-and-set under the mutex: no await between observing the
            // slot and registering as (or joining) the active exchange.
            let mut flight = self.flight.lock().await;
            match flight.as_ref() {
                Some(rx) => {
                    debug!("joining in-flight token refresh");
                    rx.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    *flight = Some(rx.clone());

                    let store = self.store.clone();
                    let client = self.client.clone();
                    let base_url = self.base_url.clone();
                    let timeout = self.timeout;
                    let skew = self.skew;
                    let slot = self.flight.clone();
                    tokio::spawn(async move {
                        let outcome = run_exchange(&client, &base_url, timeout, skew, &store).await;
                        match &outcome {
                            Ok(_) => info!("token refresh resolved with a fresh pair"),
                            Err(e) => warn!(error = %e, "token refresh failed, session is over"),
                        }
                        // Store state is already settled. Return the slot to
                        // idle first so a caller arriving after resolution
                        // starts from the settled store (and short-circuits on
                        // it) instead of reading this flight's outcome late;
                        // then release all waiters at once.
                        *slot.lock().await = None;
                        let _ = tx.send(Some(outcome));
                    });

                    rx
                }
            }
        };

        loop {
            let settled = rx.borrow_and_update().clone();
            if let Some(outcome) = settled {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(Error::Http(
                    "refresh exchange ended without reporting a result".into(),
                ));
            }
        }
    }
}

/// Perform one refresh exchange and settle the store before returning.
async fn run_exchange(
    client: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
    skew: Duration,
    store: &TokenStore,
) -> RefreshOutcome {
    let Some(current) = store.get().await else {
        metrics::record_refresh("no_session");
        return Err(Error::NotFound("no session tokens stored".into()));
    };

    // A previous exchange may have completed between this caller's 401 and
    // the flight starting; its rotated refresh token is already stored and
    // the pair is fresh, so another exchange would be both wasteful and racy.
    if !store.is_expired(skew).await {
        debug!("stored tokens already fresh, reusing them");
        metrics::record_refresh("reused");
        return Ok(current);
    }

    match token::refresh(client, base_url, &current.refresh_token, timeout).await {
        Ok(grant) => {
            // The server either rotated the refresh token or let us keep the
            // old one; trust whatever it declared.
            let refresh_token = grant
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone());
            let pair = TokenPair::issued(grant.access_token, refresh_token, grant.expires_in);
            if let Err(e) = store.set(pair.clone()).await {
                warn!(error = %e, "failed to persist refreshed tokens");
            }
            metrics::record_refresh("success");
            Ok(pair)
        }
        Err(err) => {
            if let Err(e) = store.clear().await {
                warn!(error = %e, "failed to clear tokens after refresh failure");
            }
            metrics::record_refresh(refresh_failure_label(&err));
            Err(err)
        }
    }
}

fn refresh_failure_label(err: &Error) -> &'static str {
    match err {
        Error::Endpoint { .. } => "rejected",
        Error::TimedOut => "timeout",
        _ => "failed",
    }
}
