//! Session token storage
//!
//! Holds the current access/refresh token pair and its absolute expiry behind
//! a tokio Mutex, write-through to an injected [`TokenBackend`] so the session
//! survives process restart. The store is an explicitly constructed instance
//! (no module-level globals) so tests and embedders can substitute an
//! in-memory backend.
//!
//! Write discipline: on the request path only the refresh coordinator calls
//! `set`/`clear`; the request authorizer only reads. The session lifecycle
//! entry points (login, register, logout) also write, serialized by the same
//! mutex.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::TokenBackend;
use crate::error::Result;

/// The current session's token pair.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute, not a delta).
/// It is derived exactly once, at issue time, from the server's `expires_in`
/// seconds delta plus the current time; nothing else recomputes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived bearer credential attached to outgoing requests
    pub access_token: String,
    /// Longer-lived credential exchanged for new access tokens; may be
    /// rotated by the authorization server on each use
    pub refresh_token: String,
    /// Expiration as unix timestamp in milliseconds
    pub expires_at: u64,
}

impl TokenPair {
    /// Build a pair from a grant issued now, converting the server's
    /// `expires_in` seconds delta into an absolute millisecond expiry.
    pub fn issued(access_token: String, refresh_token: String, expires_in_secs: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now_millis() + expires_in_secs * 1000,
        }
    }
}

/// Current unix time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Whether a token expiring at `expires_at` should be treated as expired at
/// `now_ms`, applying a skew margin so a token that is valid when read is not
/// already expired by the time the request reaches the server.
fn expired_with_skew(now_ms: u64, skew: Duration, expires_at: u64) -> bool {
    now_ms.saturating_add(skew.as_millis() as u64) >= expires_at
}

/// Mutex-guarded token state, write-through to a durable backend.
///
/// All three fields of the pair are written and cleared together; readers
/// never observe an access token paired with a stale expiry or a missing
/// refresh token.
pub struct TokenStore {
    backend: Arc<dyn TokenBackend>,
    state: Mutex<Option<TokenPair>>,
}

impl TokenStore {
    /// Create a store, loading any persisted pair from the backend.
    pub async fn load(backend: Arc<dyn TokenBackend>) -> Result<Self> {
        let state = backend.load().await?;
        if let Some(pair) = &state {
            debug!(expires_at = pair.expires_at, "loaded persisted session tokens");
        }
        Ok(Self {
            backend,
            state: Mutex::new(state),
        })
    }

    /// Get a clone of the current pair, if a session exists.
    pub async fn get(&self) -> Option<TokenPair> {
        self.state.lock().await.clone()
    }

    /// Replace the stored pair wholesale and persist it.
    ///
    /// The lock is held across the durable write, so concurrent writers
    /// cannot interleave and readers never see memory and backend disagree
    /// mid-update. The in-memory pair is replaced before persisting: a reader
    /// released after `set` sees the new pair even if the durable write
    /// failed; the error is still returned for the caller to log.
    pub async fn set(&self, pair: TokenPair) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = Some(pair.clone());
        self.backend.persist(&pair).await
    }

    /// Clear all token state, in memory and in the backend.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        *state = None;
        debug!("cleared session tokens");
        self.backend.clear().await
    }

    /// Whether the stored access token is expired (or will be within `skew`).
    ///
    /// An empty store counts as expired: there is nothing valid to attach.
    pub async fn is_expired(&self, skew: Duration) -> bool {
        match self.state.lock().await.as_ref() {
            Some(pair) => expired_with_skew(now_millis(), skew, pair.expires_at),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn test_pair(expires_at: u64) -> TokenPair {
        TokenPair {
            access_token: "at_test".into(),
            refresh_token: "rt_test".into(),
            expires_at,
        }
    }

    /// Expiration far in the future (year 2100).
    fn future_expiry() -> u64 {
        4_102_444_800_000
    }

    #[tokio::test]
    async fn round_trip_set_get() {
        let store = TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap();
        let pair = test_pair(future_expiry());
        store.set(pair.clone()).await.unwrap();

        let read = store.get().await.unwrap();
        assert_eq!(read.access_token, pair.access_token);
        assert_eq!(read.refresh_token, pair.refresh_token);
        assert_eq!(read.expires_at, pair.expires_at);
        assert_eq!(read, pair);
    }

    #[tokio::test]
    async fn empty_store_returns_none_and_is_expired() {
        let store = TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap();
        assert!(store.get().await.is_none());
        assert!(store.is_expired(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn clear_removes_pair() {
        let backend = Arc::new(MemoryBackend::new());
        let store = TokenStore::load(backend.clone()).await.unwrap();
        store.set(test_pair(future_expiry())).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.get().await.is_none());

        // A fresh store over the same backend must not resurrect the pair
        let reloaded = TokenStore::load(backend).await.unwrap();
        assert!(reloaded.get().await.is_none());
    }

    #[tokio::test]
    async fn set_persists_through_backend() {
        let backend = Arc::new(MemoryBackend::new());
        let store = TokenStore::load(backend.clone()).await.unwrap();
        store.set(test_pair(future_expiry())).await.unwrap();

        let reloaded = TokenStore::load(backend).await.unwrap();
        assert_eq!(reloaded.get().await.unwrap().access_token, "at_test");
    }

    #[tokio::test]
    async fn future_token_is_not_expired() {
        let store = TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap();
        store.set(test_pair(future_expiry())).await.unwrap();
        assert!(!store.is_expired(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn past_token_is_expired() {
        let store = TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap();
        store.set(test_pair(1_000_000_000)).await.unwrap();
        assert!(store.is_expired(Duration::from_secs(30)).await);
    }

    #[tokio::test]
    async fn token_inside_skew_window_is_expired() {
        let store = TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap();
        // Valid for another 10 seconds, but a 30-second skew must reject it
        store.set(test_pair(now_millis() + 10_000)).await.unwrap();
        assert!(store.is_expired(Duration::from_secs(30)).await);
        assert!(!store.is_expired(Duration::from_secs(0)).await);
    }

    #[test]
    fn expiry_boundary_exact_threshold() {
        let skew = Duration::from_secs(5);
        // now + skew == expires_at: expired
        assert!(expired_with_skew(10_000, skew, 15_000));
        // one millisecond inside the margin: still valid
        assert!(!expired_with_skew(10_000, skew, 15_001));
        // past the margin: expired
        assert!(expired_with_skew(10_000, skew, 14_999));
    }

    #[test]
    fn expiry_check_does_not_overflow() {
        assert!(expired_with_skew(u64::MAX, Duration::from_secs(30), u64::MAX));
    }

    #[test]
    fn issued_derives_absolute_expiry() {
        let before = now_millis();
        let pair = TokenPair::issued("at".into(), "rt".into(), 3600);
        let after = now_millis();
        assert!(pair.expires_at >= before + 3_600_000);
        assert!(pair.expires_at <= after + 3_600_000);
    }

    #[tokio::test]
    async fn concurrent_sets_leave_a_consistent_pair() {
        let store = Arc::new(
            TokenStore::load(Arc::new(MemoryBackend::new())).await.unwrap(),
        );

        let mut handles = vec![];
        for i in 0..10u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .set(TokenPair {
                        access_token: format!("at_{i}"),
                        refresh_token: format!("rt_{i}"),
                        expires_at: 4_102_444_800_000 + i,
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Whichever write won, the three fields must be from the same write
        let pair = store.get().await.unwrap();
        let suffix = pair.access_token.strip_prefix("at_").unwrap().to_string();
        assert_eq!(pair.refresh_token, format!("rt_{suffix}"));
        let i: u64 = suffix.parse().unwrap();
        assert_eq!(pair.expires_at, 4_102_444_800_000 + i);
    }
}
