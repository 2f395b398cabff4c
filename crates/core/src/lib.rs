pub mod config;
pub mod game_files;
pub mod matchmaking;
pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod schedule;
pub mod services;
pub mod supervisor;
pub mod testing;
pub mod token;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use game_files::{FsGameFiles, GameFiles, GameFilesConfig, GameFilesError};
pub use matchmaking::{
    MatchOutcome, MatchPhase, MatchState, MatchmakingClient, MatchmakingConfig, MatchmakingError,
    WsConnector,
};
pub use orchestrator::{
    MatchContext, MatchOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus,
};
pub use poller::{PollerConfig, PollerStatus, SessionPoller};
pub use services::{
    AccountApi, Backend, BackendConfig, CredentialsConfig, HttpBackend, HttpGameServices,
    MatchmakingApi, ServiceError, ServicesConfig, SessionDescriptor, SessionSource,
};
pub use supervisor::{
    GameProcess, ProcessControl, ProcessSupervisor, SupervisorConfig, SupervisorError,
    SystemProcessTable,
};
pub use token::{HeaderKind, TokenStore};
