use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::game_files::GameFilesConfig;
use crate::matchmaking::MatchmakingConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::poller::PollerConfig;
use crate::services::{BackendConfig, CredentialsConfig, ServicesConfig};
use crate::supervisor::SupervisorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub game_files: GameFilesConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Status API server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    pub credentials: SanitizedCredentialsConfig,
    pub backend: SanitizedBackendConfig,
    pub poller: PollerConfig,
    pub supervisor: SanitizedSupervisorConfig,
    pub matchmaking: MatchmakingConfig,
    pub game_files: GameFilesConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Credentials with every secret hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCredentialsConfig {
    pub account_token_configured: bool,
    pub client_id: String,
    pub client_secret_configured: bool,
}

/// Backend config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBackendConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

/// Supervisor config without the opaque launch arguments
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedSupervisorConfig {
    pub helper_path: String,
    pub game_path: String,
    pub executable_name: String,
    pub launch_timeout_ms: u64,
    pub watchdog_grace_ms: u64,
    pub watchdog_kill_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            services: config.services.clone(),
            credentials: SanitizedCredentialsConfig {
                account_token_configured: config
                    .credentials
                    .account_token
                    .as_ref()
                    .is_some_and(|t| !t.is_empty()),
                client_id: config.credentials.client_id.clone(),
                client_secret_configured: !config.credentials.client_secret.is_empty(),
            },
            backend: SanitizedBackendConfig {
                url: config.backend.url.clone(),
                api_key_configured: config
                    .backend
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
                timeout_secs: config.backend.timeout_secs,
            },
            poller: config.poller.clone(),
            supervisor: SanitizedSupervisorConfig {
                helper_path: config.supervisor.helper_path.display().to_string(),
                game_path: config.supervisor.game_path.display().to_string(),
                executable_name: config.supervisor.executable_name(),
                launch_timeout_ms: config.supervisor.launch_timeout_ms,
                watchdog_grace_ms: config.supervisor.watchdog_grace_ms,
                watchdog_kill_ms: config.supervisor.watchdog_kill_ms,
            },
            matchmaking: config.matchmaking.clone(),
            game_files: config.game_files.clone(),
            orchestrator: config.orchestrator.clone(),
        }
    }
}
