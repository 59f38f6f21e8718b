//! Request and response values carried through the client
//!
//! A [`PendingRequest`] is everything needed to (re)submit one logical API
//! call. The `retried` flag is an explicit field, set before the single
//! permitted resubmission; a request that fails after being retried once is
//! never retried again.

use reqwest::Method;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

/// An outgoing API request, ready for authorization and submission.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path joined to the configured API base URL, e.g. `/products/42`
    pub path: String,
    /// Caller-supplied headers; the authorizer adds its own on top
    pub headers: HeaderMap,
    /// Optional JSON body
    pub body: Option<serde_json::Value>,
    /// Whether the one permitted post-refresh resubmission has been used
    pub retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = Some(body);
        request
    }

    pub fn put(path: impl Into<String>, body: serde_json::Value) -> Self {
        let mut request = Self::new(Method::PUT, path);
        request.body = Some(body);
        request
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// A completed API response (2xx only; everything else becomes an error).
#[derive(Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    /// Deserialize the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}
