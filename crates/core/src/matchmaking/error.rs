//! Error types for the matchmaking client.

use thiserror::Error;

use crate::services::ServiceError;

/// Errors that end a matchmaking attempt.
#[derive(Debug, Error)]
pub enum MatchmakingError {
    /// The ticket request failed.
    #[error("ticket request failed: {0}")]
    Ticket(#[source] ServiceError),

    /// Every socket connect attempt failed.
    #[error("socket connect failed after {attempts} attempts: {reason}")]
    ConnectFailed { attempts: u32, reason: String },

    /// The socket failed while connected.
    #[error("socket error: {0}")]
    Transport(String),

    /// Session lookup failed (after the fallback, if any).
    #[error("session resolution failed: {0}")]
    Resolution(#[source] ServiceError),

    /// The backend rejected the hand-off.
    #[error("backend hand-off failed: {0}")]
    Handoff(#[source] ServiceError),

    /// The socket closed, or `close()` was called, before a session resolved.
    #[error("matchmaking closed before a session was resolved")]
    ClosedBeforeResolution,
}

impl MatchmakingError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// Whether the underlying failure was a rejected credential.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Ticket(e) | Self::Resolution(e) | Self::Handoff(e) => e.is_unauthorized(),
            _ => false,
        }
    }
}
