//! Session poller configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the session poller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Region the session list is scoped to.
    #[serde(default = "default_region")]
    pub region: String,

    /// How often to poll the session list (milliseconds).
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Minimum spacing of "waiting for sessions" log lines (seconds).
    #[serde(default = "default_log_window")]
    pub waiting_log_window_secs: u64,

    /// How often the processed-session set is cleared (seconds, 0 = never).
    #[serde(default = "default_reset_interval")]
    pub processed_reset_interval_secs: u64,
}

fn default_region() -> String {
    "EU".to_string()
}

fn default_interval() -> u64 {
    1000 // 1 second
}

fn default_log_window() -> u64 {
    5
}

fn default_reset_interval() -> u64 {
    600 // 10 minutes
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            interval_ms: default_interval(),
            waiting_log_window_secs: default_log_window(),
            processed_reset_interval_secs: default_reset_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.region, "EU");
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.waiting_log_window_secs, 5);
        assert_eq!(config.processed_reset_interval_secs, 600);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            region = "NAE"
            interval_ms = 250
        "#;
        let config: PollerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.region, "NAE");
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.waiting_log_window_secs, 5);
    }
}
