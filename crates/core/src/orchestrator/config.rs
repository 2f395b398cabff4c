//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the match orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Enable/disable automatic attempts.
    /// When disabled, the poller is not started and the status API still serves.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// How long to wait for the game client to show up after launch (milliseconds).
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    /// Fixed delay between a ready client and in-game authentication (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Delay before polling resumes after a resolved attempt (milliseconds).
    #[serde(default = "default_resume_delay")]
    pub success_resume_delay_ms: u64,

    /// Delay before polling resumes after a failed attempt (milliseconds).
    #[serde(default = "default_failure_cooldown")]
    pub failure_cooldown_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_ready_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_settle_delay() -> u64 {
    5_000 // 5 seconds
}

fn default_resume_delay() -> u64 {
    5_000 // 5 seconds
}

fn default_failure_cooldown() -> u64 {
    5_000 // 5 seconds
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ready_timeout_ms: default_ready_timeout(),
            settle_delay_ms: default_settle_delay(),
            success_resume_delay_ms: default_resume_delay(),
            failure_cooldown_ms: default_failure_cooldown(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.success_resume_delay_ms, 5000);
        assert_eq!(config.failure_cooldown_ms, 5000);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            enabled = false
            settle_delay_ms = 8000
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.settle_delay_ms, 8000);
        assert_eq!(config.ready_timeout_ms, 30_000);
    }
}
