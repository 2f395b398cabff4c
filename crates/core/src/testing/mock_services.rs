//! Mock remote services.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::services::{
    AccountApi, Backend, ExchangeCredential, GameSession, Handoff, MatchmakingApi,
    MatchmakingTicket, ServerInfo, ServiceError, SessionDescriptor, SessionSource, TicketRequest,
};
use crate::token::HeaderKind;

use super::fixtures;

/// Mock implementation of [`SessionSource`].
///
/// Returns the configured session list, records the regions it was asked
/// for, and tracks how many listings ran concurrently.
#[derive(Debug, Default)]
pub struct MockSessionSource {
    sessions: RwLock<Vec<SessionDescriptor>>,
    /// If set, the next listing fails with this error.
    next_error: RwLock<Option<ServiceError>>,
    /// Simulated listing latency.
    delay: RwLock<Option<Duration>>,
    regions: RwLock<Vec<String>>,
    in_flight: RwLock<usize>,
    max_in_flight: RwLock<usize>,
}

impl MockSessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_sessions(&self, sessions: Vec<SessionDescriptor>) {
        *self.sessions.write().await = sessions;
    }

    /// Configure the next listing to fail with the given error.
    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Regions passed to every listing so far.
    pub async fn recorded_regions(&self) -> Vec<String> {
        self.regions.read().await.clone()
    }

    pub async fn list_count(&self) -> usize {
        self.regions.read().await.len()
    }

    /// Highest number of listings that were in flight at the same time.
    pub async fn max_in_flight(&self) -> usize {
        *self.max_in_flight.read().await
    }
}

#[async_trait]
impl SessionSource for MockSessionSource {
    async fn list_sessions(&self, region: &str) -> Result<Vec<SessionDescriptor>, ServiceError> {
        self.regions.write().await.push(region.to_string());
        {
            let mut in_flight = self.in_flight.write().await;
            *in_flight += 1;
            let mut max = self.max_in_flight.write().await;
            *max = (*max).max(*in_flight);
        }

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        *self.in_flight.write().await -= 1;

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self.sessions.read().await.clone())
    }
}

/// Mock implementation of [`AccountApi`].
#[derive(Debug, Default)]
pub struct MockAccountApi {
    mint_error: RwLock<Option<ServiceError>>,
    auth_error: RwLock<Option<ServiceError>>,
    minted: RwLock<u32>,
    /// Codes presented to `authenticate`.
    authenticated: RwLock<Vec<String>>,
    /// Simulated authentication latency.
    auth_delay: RwLock<Option<Duration>>,
}

impl MockAccountApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_mint_error(&self, error: ServiceError) {
        *self.mint_error.write().await = Some(error);
    }

    pub async fn set_auth_error(&self, error: ServiceError) {
        *self.auth_error.write().await = Some(error);
    }

    pub async fn set_auth_delay(&self, delay: Duration) {
        *self.auth_delay.write().await = Some(delay);
    }

    pub async fn mint_count(&self) -> u32 {
        *self.minted.read().await
    }

    pub async fn authenticated_codes(&self) -> Vec<String> {
        self.authenticated.read().await.clone()
    }
}

#[async_trait]
impl AccountApi for MockAccountApi {
    async fn mint_exchange_code(&self) -> Result<ExchangeCredential, ServiceError> {
        let mut minted = self.minted.write().await;
        *minted += 1;
        if let Some(error) = self.mint_error.write().await.take() {
            return Err(error);
        }
        Ok(fixtures::credential(&format!("exchange-{}", *minted)))
    }

    async fn authenticate(
        &self,
        credential: ExchangeCredential,
    ) -> Result<GameSession, ServiceError> {
        self.authenticated.write().await.push(credential.code);
        let delay = *self.auth_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.auth_error.write().await.take() {
            return Err(error);
        }
        Ok(fixtures::game_session("acc-1"))
    }
}

/// Mock implementation of [`MatchmakingApi`].
#[derive(Debug)]
pub struct MockMatchmakingApi {
    ticket: RwLock<MatchmakingTicket>,
    ticket_error: RwLock<Option<ServiceError>>,
    server: RwLock<ServerInfo>,
    /// Lookup errors, consumed in order before lookups succeed.
    lookup_errors: RwLock<VecDeque<ServiceError>>,
    ticket_requests: RwLock<Vec<TicketRequest>>,
    lookups: RwLock<Vec<(String, HeaderKind)>>,
}

impl Default for MockMatchmakingApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMatchmakingApi {
    pub fn new() -> Self {
        Self {
            ticket: RwLock::new(MatchmakingTicket {
                ticket_type: "ticket-type".to_string(),
                payload: "ticket-payload".to_string(),
                signature: "ticket-signature".to_string(),
                service_url: "wss://matchmaking.example.com".to_string(),
            }),
            ticket_error: RwLock::new(None),
            server: RwLock::new(ServerInfo {
                server_address: "10.0.0.1".to_string(),
                server_port: 7777,
                attributes: None,
            }),
            lookup_errors: RwLock::new(VecDeque::new()),
            ticket_requests: RwLock::new(Vec::new()),
            lookups: RwLock::new(Vec::new()),
        }
    }

    /// Configure the next ticket request to fail.
    pub async fn set_ticket_error(&self, error: ServiceError) {
        *self.ticket_error.write().await = Some(error);
    }

    pub async fn set_server(&self, server: ServerInfo) {
        *self.server.write().await = server;
    }

    pub async fn set_lookup_errors(&self, errors: Vec<ServiceError>) {
        *self.lookup_errors.write().await = errors.into();
    }

    pub async fn ticket_requests(&self) -> Vec<TicketRequest> {
        self.ticket_requests.read().await.clone()
    }

    /// Session ids and header kinds of every lookup so far.
    pub async fn lookups(&self) -> Vec<(String, HeaderKind)> {
        self.lookups.read().await.clone()
    }
}

#[async_trait]
impl MatchmakingApi for MockMatchmakingApi {
    async fn request_ticket(
        &self,
        _access_token: &str,
        request: &TicketRequest,
    ) -> Result<MatchmakingTicket, ServiceError> {
        self.ticket_requests.write().await.push(request.clone());
        if let Some(error) = self.ticket_error.write().await.take() {
            return Err(error);
        }
        Ok(self.ticket.read().await.clone())
    }

    async fn lookup_session(
        &self,
        session_id: &str,
        kind: HeaderKind,
    ) -> Result<ServerInfo, ServiceError> {
        self.lookups
            .write()
            .await
            .push((session_id.to_string(), kind));
        if let Some(error) = self.lookup_errors.write().await.pop_front() {
            return Err(error);
        }
        Ok(self.server.read().await.clone())
    }
}

/// Mock implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct MockBackend {
    handoffs: Arc<RwLock<Vec<Handoff>>>,
    next_error: RwLock<Option<ServiceError>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the next hand-off to fail. Failed hand-offs are still recorded.
    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn handoffs(&self) -> Vec<Handoff> {
        self.handoffs.read().await.clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn post_handoff(&self, handoff: &Handoff) -> Result<(), ServiceError> {
        self.handoffs.write().await.push(handoff.clone());
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(())
    }
}
