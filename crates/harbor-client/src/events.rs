//! Session lifecycle events
//!
//! The client never navigates or touches UI state; it broadcasts events and
//! the application shell decides what to do with them (typically: route to
//! the login surface on `Expired`). Delivered over a tokio broadcast channel
//! so any number of shell components can subscribe independently.

/// Events emitted by the authenticated client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session cannot be recovered: the refresh token was rejected, the
    /// exchange failed terminally, or a request stayed unauthorized after a
    /// refreshed token. Local token state has already been cleared where
    /// applicable; the subscriber is expected to send the user back through
    /// authentication.
    Expired { reason: String },
}
