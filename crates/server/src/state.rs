use matchlink_core::{Config, MatchOrchestrator, SanitizedConfig};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<MatchOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<MatchOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<MatchOrchestrator> {
        &self.orchestrator
    }
}
