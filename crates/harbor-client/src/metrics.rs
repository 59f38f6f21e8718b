//! Metrics recorded by the authenticated client
//!
//! Counters emitted through the `metrics` facade; the embedding application
//! installs whatever recorder it exposes (Prometheus or otherwise):
//!
//! - `auth_client_requests_total` (counter): labels `status`, `method`
//! - `auth_client_upstream_trouble_total` (counter): label `status` — 5xx and
//!   429 outcomes forwarded for alerting, never retried by this layer
//! - `auth_client_token_refresh_total` (counter): label `outcome`
//! - `auth_client_sessions_expired_total` (counter)

/// Record a completed request attempt with status and method labels.
pub fn record_request(status: u16, method: &str) {
    metrics::counter!(
        "auth_client_requests_total",
        "status" => status.to_string(),
        "method" => method.to_string()
    )
    .increment(1);
}

/// Record a 5xx/429 outcome for the observability sink.
pub fn record_upstream_trouble(status: u16) {
    metrics::counter!(
        "auth_client_upstream_trouble_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a refresh exchange outcome (`success`, `reused`, `rejected`, ...).
pub fn record_refresh(outcome: &str) {
    metrics::counter!(
        "auth_client_token_refresh_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a terminal session expiry.
pub fn record_session_expired() {
    metrics::counter!("auth_client_sessions_expired_total").increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // When no recorder is installed, metrics calls are no-ops.
        record_request(200, "GET");
        record_upstream_trouble(503);
        record_refresh("success");
        record_session_expired();
    }

    /// Create an isolated recorder/handle pair for unit tests. Avoids the
    /// global recorder singleton constraint — only one global recorder can
    /// exist per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn request_counter_carries_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request(200, "GET");
        record_request(401, "POST");

        let output = handle.render();
        assert!(output.contains("auth_client_requests_total"));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("method=\"GET\""));
        assert!(output.contains("status=\"401\""));
        assert!(output.contains("method=\"POST\""));
    }

    #[test]
    fn upstream_trouble_counter_carries_status() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_upstream_trouble(503);
        record_upstream_trouble(429);

        let output = handle.render();
        assert!(output.contains("auth_client_upstream_trouble_total"));
        assert!(output.contains("status=\"503\""));
        assert!(output.contains("status=\"429\""));
    }

    #[test]
    fn refresh_counter_carries_outcome() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh("success");
        record_refresh("rejected");

        let output = handle.render();
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"rejected\""));
    }

    #[test]
    fn session_expired_counter_renders() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_session_expired();

        let output = handle.render();
        assert!(output.contains("auth_client_sessions_expired_total"));
    }
}
