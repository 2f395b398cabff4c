//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Session poller (polls, errors, eligible sessions)
//! - Process supervisor (launches, watchdog kills)
//! - Matchmaking (socket retries, frame anomalies, hand-offs)
//! - Orchestrator (attempt outcomes and durations)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Session Poller
// =============================================================================

/// Session list polls issued.
pub static POLLS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("matchlink_polls_total", "Total session list polls").unwrap()
});

/// Session list polls that failed at the network level.
pub static POLL_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "matchlink_poll_errors_total",
        "Total session list polls that failed",
    )
    .unwrap()
});

/// Eligible sessions found by the poller.
pub static ELIGIBLE_SESSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "matchlink_eligible_sessions_total",
            "Total eligible sessions found",
        ),
        &["tier"], // "not_started", "empty_started"
    )
    .unwrap()
});

// =============================================================================
// Process Supervisor
// =============================================================================

/// Game client launches by result.
pub static LAUNCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("matchlink_launches_total", "Total game client launches"),
        &["result"], // "result_line", "stdout_pid", "process_query", "timeout", "helper_failed"
    )
    .unwrap()
});

/// Processes killed by the watchdog.
pub static WATCHDOG_KILLS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "matchlink_watchdog_kills_total",
        "Total game processes terminated by the watchdog",
    )
    .unwrap()
});

// =============================================================================
// Matchmaking
// =============================================================================

/// Socket connect retries.
pub static SOCKET_CONNECT_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "matchlink_socket_connect_retries_total",
        "Total matchmaking socket connect retries",
    )
    .unwrap()
});

/// Frame fragments that could not be parsed.
pub static FRAME_ANOMALIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "matchlink_frame_anomalies_total",
        "Total malformed matchmaking frame fragments",
    )
    .unwrap()
});

/// Backend hand-offs by result.
pub static HANDOFFS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("matchlink_handoffs_total", "Total backend hand-offs"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Orchestrator
// =============================================================================

/// Match attempts by result.
pub static ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("matchlink_attempts_total", "Total match attempts"),
        &["result"], // "resolved", "failed"
    )
    .unwrap()
});

/// Match attempt duration in seconds.
pub static ATTEMPT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "matchlink_attempt_duration_seconds",
            "Duration of match attempts",
        )
        .buckets(vec![1.0, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 90.0, 120.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(POLLS_TOTAL.clone()),
        Box::new(POLL_ERRORS.clone()),
        Box::new(ELIGIBLE_SESSIONS.clone()),
        Box::new(LAUNCHES.clone()),
        Box::new(WATCHDOG_KILLS.clone()),
        Box::new(SOCKET_CONNECT_RETRIES.clone()),
        Box::new(FRAME_ANOMALIES.clone()),
        Box::new(HANDOFFS.clone()),
        Box::new(ATTEMPTS.clone()),
        Box::new(ATTEMPT_DURATION.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        ATTEMPTS.with_label_values(&["resolved"]).inc();
        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"matchlink_attempts_total".to_string()));
    }
}
