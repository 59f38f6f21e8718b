//! Session token management for the Harbor web API
//!
//! Provides durable storage for the current access/refresh token pair and the
//! authorization-server wire calls that issue and renew it. This crate is a
//! standalone library with no dependency on the client layer — it can be
//! tested and used independently.
//!
//! Token flow:
//! 1. Client calls [`token::login`] or [`token::register`] for a full grant
//! 2. The grant is converted to a [`TokenPair`] via [`TokenPair::issued`]
//! 3. The pair is stored through [`TokenStore::set`] (write-through to a
//!    [`TokenBackend`])
//! 4. When the access token expires, [`token::refresh`] exchanges the refresh
//!    token for a new one; the server may rotate the refresh token
//! 5. On logout or an unrecoverable auth failure, [`TokenStore::clear`]
//!    destroys all three durable entries as a unit

pub mod backend;
pub mod error;
pub mod store;
pub mod token;

pub use backend::{FileBackend, MemoryBackend, TokenBackend};
pub use error::{Error, Result};
pub use store::{TokenPair, TokenStore, now_millis};
pub use token::{Credentials, RefreshGrant, SessionGrant};
