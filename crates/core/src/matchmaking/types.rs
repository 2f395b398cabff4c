//! Matchmaking attempt state.

use serde::Serialize;

use crate::services::ServerInfo;

/// Phase of a matchmaking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    #[default]
    Idle,
    TicketRequested,
    SocketConnecting,
    Connecting,
    Waiting,
    Queued,
    SessionAssignment,
    Play,
    Resolved,
    Closed,
}

/// Per-attempt state, reset on close.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchState {
    pub phase: MatchPhase,
    pub ticket_id: Option<String>,
    pub match_id: Option<String>,
    pub session_id: Option<String>,
    pub resolved: bool,
    pub handed_off: bool,
}

/// A resolved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub session_id: String,
    pub match_id: String,
    pub server: ServerInfo,
    pub handed_off: bool,
}
