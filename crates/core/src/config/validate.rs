use super::{types::Config, ConfigError};

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Service and backend URLs are set
/// - Poller interval and supervisor timeouts are positive
/// - Watchdog grace mark comes before the kill mark
/// - At least one socket connect attempt
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.services.account_base_url.trim().is_empty() {
        return Err(invalid("services.account_base_url is required"));
    }
    if config.services.game_base_url.trim().is_empty() {
        return Err(invalid("services.game_base_url is required"));
    }
    if config.backend.url.trim().is_empty() {
        return Err(invalid("backend.url is required"));
    }

    if config.poller.region.trim().is_empty() {
        return Err(invalid("poller.region is required"));
    }
    if config.poller.interval_ms == 0 {
        return Err(invalid("poller.interval_ms must be positive"));
    }

    let supervisor = &config.supervisor;
    if supervisor.launch_timeout_ms == 0 {
        return Err(invalid("supervisor.launch_timeout_ms must be positive"));
    }
    if supervisor.process_query_interval_ms == 0 {
        return Err(invalid(
            "supervisor.process_query_interval_ms must be positive",
        ));
    }
    if supervisor.watchdog_grace_ms >= supervisor.watchdog_kill_ms {
        return Err(invalid(
            "supervisor.watchdog_grace_ms must be less than supervisor.watchdog_kill_ms",
        ));
    }
    if supervisor.executable_name().is_empty() {
        return Err(invalid("supervisor.game_path must name an executable"));
    }

    if config.matchmaking.connect_attempts == 0 {
        return Err(invalid("matchmaking.connect_attempts must be at least 1"));
    }

    Ok(())
}
