//! Seams between the engine and the remote services.

use async_trait::async_trait;

use crate::token::HeaderKind;

use super::error::ServiceError;
use super::types::{
    ExchangeCredential, GameSession, Handoff, MatchmakingTicket, ServerInfo, SessionDescriptor,
    TicketRequest,
};

/// Source of the remote session list.
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// List sessions in `region`.
    async fn list_sessions(&self, region: &str) -> Result<Vec<SessionDescriptor>, ServiceError>;
}

/// Account service: exchange credentials and in-game authentication.
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Mint a one-time exchange credential.
    async fn mint_exchange_code(&self) -> Result<ExchangeCredential, ServiceError>;

    /// Authenticate as the game client, consuming the credential.
    async fn authenticate(&self, credential: ExchangeCredential)
        -> Result<GameSession, ServiceError>;
}

/// Game service: matchmaking tickets and session resolution.
#[async_trait]
pub trait MatchmakingApi: Send + Sync {
    /// Request a signed matchmaking ticket.
    async fn request_ticket(
        &self,
        access_token: &str,
        request: &TicketRequest,
    ) -> Result<MatchmakingTicket, ServiceError>;

    /// Look up the server address of a session using the `kind` header set.
    async fn lookup_session(
        &self,
        session_id: &str,
        kind: HeaderKind,
    ) -> Result<ServerInfo, ServiceError>;
}

/// External backend receiving resolved sessions.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn post_handoff(&self, handoff: &Handoff) -> Result<(), ServiceError>;
}
