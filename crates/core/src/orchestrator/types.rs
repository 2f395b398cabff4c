//! Types for the match orchestrator.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::game_files::GameFilesError;
use crate::matchmaking::{MatchState, MatchmakingError};
use crate::poller::PollerStatus;
use crate::services::ServiceError;
use crate::supervisor::{SupervisorError, SupervisorStatus};

/// Failure taxonomy used for logging, metrics and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Retried where a retry exists (socket connect); otherwise ends the attempt.
    TransientNetwork,
    /// Unexpected payload from a remote.
    ProtocolAnomaly,
    /// The remote rejected a credential.
    CredentialInvalid,
    /// Helper or client failed to start, report a PID, or stay up.
    ProcessLifecycle,
    /// Missing external prerequisite.
    FatalStartup,
    /// The backend rejected the hand-off.
    Backend,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::ProtocolAnomaly => "protocol_anomaly",
            Self::CredentialInvalid => "credential_invalid",
            Self::ProcessLifecycle => "process_lifecycle",
            Self::FatalStartup => "fatal_startup",
            Self::Backend => "backend",
        }
    }

    fn of_service(e: &ServiceError) -> Self {
        match e {
            ServiceError::Unauthorized { .. } => Self::CredentialInvalid,
            ServiceError::Decode { .. } => Self::ProtocolAnomaly,
            ServiceError::Status { status, .. } if *status < 500 => Self::ProtocolAnomaly,
            _ => Self::TransientNetwork,
        }
    }
}

/// Errors that end a match attempt.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Game files could not be prepared.
    #[error("game file preparation failed: {0}")]
    GameFiles(#[from] GameFilesError),

    /// Exchange credential could not be minted.
    #[error("exchange credential mint failed: {0}")]
    Mint(#[source] ServiceError),

    /// Game client launch failed.
    #[error("launch failed: {0}")]
    Launch(#[from] SupervisorError),

    /// Game client never showed up in the process table.
    #[error("game client not ready after {timeout_ms} ms")]
    NotReady { timeout_ms: u64 },

    /// In-game authentication failed.
    #[error("in-game authentication failed: {0}")]
    Authenticate(#[source] ServiceError),

    /// Matchmaking failed.
    #[error("matchmaking failed: {0}")]
    Matchmaking(#[from] MatchmakingError),

    /// The watchdog grace period elapsed before the attempt finished.
    #[error("game client watchdog grace period elapsed")]
    WatchdogExpired,

    /// The orchestrator was stopped mid-attempt.
    #[error("orchestrator stopped")]
    Stopped,
}

impl OrchestratorError {
    /// Classify the failure.
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::GameFiles(GameFilesError::ExecutableNotFound { .. }) => {
                FailureCategory::FatalStartup
            }
            Self::GameFiles(_) => FailureCategory::ProcessLifecycle,
            Self::Mint(e) | Self::Authenticate(e) => FailureCategory::of_service(e),
            Self::Launch(
                SupervisorError::HelperNotFound { .. } | SupervisorError::ExecutableNotFound { .. },
            ) => FailureCategory::FatalStartup,
            Self::Launch(_) | Self::NotReady { .. } | Self::WatchdogExpired | Self::Stopped => {
                FailureCategory::ProcessLifecycle
            }
            Self::Matchmaking(e) => match e {
                MatchmakingError::Ticket(e) | MatchmakingError::Resolution(e) => {
                    FailureCategory::of_service(e)
                }
                MatchmakingError::Handoff(_) => FailureCategory::Backend,
                MatchmakingError::ConnectFailed { .. }
                | MatchmakingError::Transport(_)
                | MatchmakingError::ClosedBeforeResolution => FailureCategory::TransientNetwork,
            },
        }
    }

    /// Pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::GameFiles(_) => "prepare_files",
            Self::Mint(_) => "mint_credential",
            Self::Launch(_) => "launch",
            Self::NotReady { .. } => "wait_ready",
            Self::Authenticate(_) => "authenticate",
            Self::Matchmaking(_) => "matchmaking",
            Self::WatchdogExpired => "watchdog",
            Self::Stopped => "stopped",
        }
    }
}

/// Summary of the most recent attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummary {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resolved: bool,
    pub match_id: Option<String>,
    pub server: Option<String>,
    pub failed_stage: Option<&'static str>,
    pub category: Option<FailureCategory>,
    pub error: Option<String>,
}

/// Current status of the orchestrator and its components.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub attempt_in_progress: bool,
    pub current_session: Option<String>,
    pub attempts: u64,
    pub resolved: u64,
    pub failed: u64,
    pub last_attempt: Option<AttemptSummary>,
    pub has_account_token: bool,
    pub poller: PollerStatus,
    pub process: SupervisorStatus,
    pub matchmaking: MatchState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let unauthorized = OrchestratorError::Authenticate(ServiceError::Unauthorized {
            endpoint: "oauth token".into(),
        });
        assert_eq!(unauthorized.category(), FailureCategory::CredentialInvalid);
        assert_eq!(unauthorized.stage(), "authenticate");

        let timeout = OrchestratorError::Mint(ServiceError::Timeout {
            endpoint: "exchange".into(),
        });
        assert_eq!(timeout.category(), FailureCategory::TransientNetwork);

        let launch = OrchestratorError::Launch(SupervisorError::LaunchTimeout { timeout_ms: 40_000 });
        assert_eq!(launch.category(), FailureCategory::ProcessLifecycle);

        let missing = OrchestratorError::Launch(SupervisorError::HelperNotFound {
            path: "/opt/helper".into(),
        });
        assert_eq!(missing.category(), FailureCategory::FatalStartup);

        let handoff = OrchestratorError::Matchmaking(MatchmakingError::Handoff(
            ServiceError::Status {
                endpoint: "backend".into(),
                status: 503,
                body: String::new(),
            },
        ));
        assert_eq!(handoff.category(), FailureCategory::Backend);

        let connect = OrchestratorError::from(MatchmakingError::ConnectFailed {
            attempts: 3,
            reason: "refused".into(),
        });
        assert_eq!(connect.category(), FailureCategory::TransientNetwork);
        assert_eq!(connect.category().as_str(), "transient_network");
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::NotReady { timeout_ms: 30_000 };
        assert_eq!(err.to_string(), "game client not ready after 30000 ms");

        let watchdog = OrchestratorError::WatchdogExpired;
        assert_eq!(watchdog.stage(), "watchdog");
        assert_eq!(watchdog.category(), FailureCategory::ProcessLifecycle);
    }
}
