//! Outcome classification for completed request attempts
//!
//! Maps HTTP statuses and transport failures onto a closed error taxonomy,
//! and extracts the human-readable message from the API's structured error
//! envelope when the body carries one. Everything here is pure and
//! side-effect-free; the recovery policy decides what to do with the class.

use serde::Deserialize;

/// Closed classification of request outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    Network,
    Cancelled,
    Unknown,
}

impl ErrorClass {
    /// Class label for metrics and logging.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClass::BadRequest => "bad_request",
            ErrorClass::Unauthorized => "unauthorized",
            ErrorClass::Forbidden => "forbidden",
            ErrorClass::NotFound => "not_found",
            ErrorClass::RateLimited => "rate_limited",
            ErrorClass::ServerError => "server_error",
            ErrorClass::Network => "network",
            ErrorClass::Cancelled => "cancelled",
            ErrorClass::Unknown => "unknown",
        }
    }
}

/// Marker for a request that produced no HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// The per-operation timeout elapsed
    TimedOut,
    /// TCP/TLS connection could not be established
    ConnectionFailed,
    /// The caller aborted the request
    Aborted,
    /// Any other failure before a response arrived
    Other,
}

/// Structured error envelope returned by the API on failures.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub details: Option<Vec<FieldError>>,
}

/// Per-field validation message inside an error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Classify an HTTP status code.
pub fn classify_status(status: u16) -> ErrorClass {
    match status {
        400 => ErrorClass::BadRequest,
        401 => ErrorClass::Unauthorized,
        403 => ErrorClass::Forbidden,
        404 => ErrorClass::NotFound,
        429 => ErrorClass::RateLimited,
        500..=599 => ErrorClass::ServerError,
        _ => ErrorClass::Unknown,
    }
}

/// Classify a failure that produced no HTTP response.
pub fn classify_transport(failure: TransportFailure) -> ErrorClass {
    match failure {
        TransportFailure::Aborted => ErrorClass::Cancelled,
        TransportFailure::TimedOut | TransportFailure::ConnectionFailed | TransportFailure::Other => {
            ErrorClass::Network
        }
    }
}

/// Pull the human-readable message out of a response body.
///
/// When the body parses as the API's error envelope the server's own message
/// wins; otherwise a generic per-class message is synthesized.
pub fn extract_message(class: ErrorClass, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.success && !envelope.error.is_empty() {
            return envelope.error;
        }
    }
    generic_message(class).to_string()
}

/// Fallback message for responses without a usable envelope.
pub fn generic_message(class: ErrorClass) -> &'static str {
    match class {
        ErrorClass::BadRequest => "the request was malformed",
        ErrorClass::Unauthorized => "authentication required",
        ErrorClass::Forbidden => "access denied",
        ErrorClass::NotFound => "resource not found",
        ErrorClass::RateLimited => "too many requests",
        ErrorClass::ServerError => "the server reported an internal error",
        ErrorClass::Network => "no response received",
        ErrorClass::Cancelled => "the request was cancelled",
        ErrorClass::Unknown => "unexpected response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_status_known_codes() {
        assert_eq!(classify_status(400), ErrorClass::BadRequest);
        assert_eq!(classify_status(401), ErrorClass::Unauthorized);
        assert_eq!(classify_status(403), ErrorClass::Forbidden);
        assert_eq!(classify_status(404), ErrorClass::NotFound);
        assert_eq!(classify_status(429), ErrorClass::RateLimited);
    }

    #[test]
    fn classify_status_server_error_range() {
        assert_eq!(classify_status(500), ErrorClass::ServerError);
        assert_eq!(classify_status(502), ErrorClass::ServerError);
        assert_eq!(classify_status(599), ErrorClass::ServerError);
    }

    #[test]
    fn classify_status_unlisted_codes_are_unknown() {
        assert_eq!(classify_status(418), ErrorClass::Unknown);
        assert_eq!(classify_status(302), ErrorClass::Unknown);
        assert_eq!(classify_status(422), ErrorClass::Unknown);
    }

    #[test]
    fn classify_transport_no_response_is_network() {
        assert_eq!(
            classify_transport(TransportFailure::TimedOut),
            ErrorClass::Network
        );
        assert_eq!(
            classify_transport(TransportFailure::ConnectionFailed),
            ErrorClass::Network
        );
        assert_eq!(
            classify_transport(TransportFailure::Other),
            ErrorClass::Network
        );
    }

    #[test]
    fn classify_transport_abort_is_cancelled() {
        assert_eq!(
            classify_transport(TransportFailure::Aborted),
            ErrorClass::Cancelled
        );
    }

    #[test]
    fn extract_message_prefers_envelope_error() {
        let body = r#"{"success":false,"error":"cart item no longer available","code":"CART_STALE"}"#;
        assert_eq!(
            extract_message(ErrorClass::BadRequest, body),
            "cart item no longer available"
        );
    }

    #[test]
    fn extract_message_parses_field_details() {
        let body = r#"{
            "success": false,
            "error": "validation failed",
            "details": [{"field": "email", "message": "is not a valid address"}]
        }"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        let details = envelope.details.unwrap();
        assert_eq!(details[0].field, "email");
        assert_eq!(details[0].message, "is not a valid address");
    }

    #[test]
    fn extract_message_falls_back_on_invalid_json() {
        let message = extract_message(ErrorClass::ServerError, "<html>502 Bad Gateway</html>");
        assert_eq!(message, "the server reported an internal error");
    }

    #[test]
    fn extract_message_falls_back_on_successful_envelope() {
        // success:true with an error field is not an error envelope
        let body = r#"{"success":true,"error":"should be ignored"}"#;
        assert_eq!(
            extract_message(ErrorClass::Unknown, body),
            "unexpected response"
        );
    }

    #[test]
    fn extract_message_falls_back_on_empty_body() {
        assert_eq!(
            extract_message(ErrorClass::RateLimited, ""),
            "too many requests"
        );
    }

    #[test]
    fn class_labels_are_stable() {
        assert_eq!(ErrorClass::RateLimited.label(), "rate_limited");
        assert_eq!(ErrorClass::Network.label(), "network");
    }
}
