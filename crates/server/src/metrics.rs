//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the matchlink server:
//! - HTTP request metrics (latency, counts)
//! - Orchestrator, poller and process status (collected dynamically)
//! - Every core metric (polls, launches, hand-offs, attempts)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "matchlink_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method", "route", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("matchlink_http_requests_total", "Total HTTP requests"),
        &["method", "route", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "matchlink_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Orchestrator Metrics (collected dynamically)
// =============================================================================

/// Orchestrator running state (1 = running, 0 = stopped).
pub static ORCHESTRATOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "matchlink_orchestrator_running",
        "Whether the orchestrator is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Whether the poller is currently polling.
pub static POLLER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "matchlink_poller_running",
        "Whether the session poller is polling (1) or paused (0)",
    )
    .unwrap()
});

/// Size of the processed session set.
pub static PROCESSED_SESSIONS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "matchlink_processed_sessions",
        "Number of session ids in the processed set",
    )
    .unwrap()
});

/// Whether a game client pid is being tracked.
pub static CLIENT_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "matchlink_client_tracked",
        "Whether a game client process is tracked (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Orchestrator
    registry
        .register(Box::new(ORCHESTRATOR_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(POLLER_RUNNING.clone()))
        .unwrap();
    registry
        .register(Box::new(PROCESSED_SESSIONS.clone()))
        .unwrap();
    registry
        .register(Box::new(CLIENT_TRACKED.clone()))
        .unwrap();

    // Core metrics (poller, supervisor, matchmaking, attempts)
    for metric in matchlink_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the orchestrator and its components.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.orchestrator().status();
    ORCHESTRATOR_RUNNING.set(i64::from(status.running));
    POLLER_RUNNING.set(i64::from(status.poller.running));
    PROCESSED_SESSIONS.set(status.poller.processed_count as i64);
    CLIENT_TRACKED.set(i64::from(status.process.tracked_pid.is_some()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("# HELP matchlink_http_requests_total"));
        assert!(output.contains("# TYPE matchlink_http_requests_total counter"));
    }

    #[test]
    fn test_core_metrics_are_registered() {
        matchlink_core::metrics::ATTEMPTS
            .with_label_values(&["resolved"])
            .inc();

        let output = encode_metrics();

        assert!(output.contains("matchlink_attempts_total"));
    }
}
