//! Matchmaking protocol client.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::MatchmakingConfig;
use super::frame::{split_frame, FrameAnomaly};
use super::messages::{InboundMessage, StatusUpdate};
use super::transport::{FrameStream, SocketConnector};
use super::types::{MatchOutcome, MatchPhase, MatchState};
use super::MatchmakingError;
use crate::metrics;
use crate::services::{
    Backend, Handoff, MatchmakingApi, MatchmakingTicket, SessionDescriptor, TicketRequest,
};
use crate::supervisor::ProcessControl;
use crate::token::HeaderKind;

/// What a dispatched message asks the read loop to do next.
enum Step {
    Continue,
    Resolve { session_id: String, match_id: String },
}

/// Drives one matchmaking attempt: ticket, socket, status stream, session
/// resolution and backend hand-off.
pub struct MatchmakingClient {
    config: MatchmakingConfig,
    api: Arc<dyn MatchmakingApi>,
    backend: Arc<dyn Backend>,
    connector: Arc<dyn SocketConnector>,
    process: Arc<dyn ProcessControl>,
    state: Mutex<MatchState>,
    close_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl MatchmakingClient {
    pub fn new(
        config: MatchmakingConfig,
        api: Arc<dyn MatchmakingApi>,
        backend: Arc<dyn Backend>,
        connector: Arc<dyn SocketConnector>,
        process: Arc<dyn ProcessControl>,
    ) -> Self {
        Self {
            config,
            api,
            backend,
            connector,
            process,
            state: Mutex::new(MatchState::default()),
            close_tx: Mutex::new(None),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: MatchPhase) {
        let mut state = self.lock_state();
        if state.phase != phase {
            debug!(from = ?state.phase, to = ?phase, "Matchmaking phase");
            state.phase = phase;
        }
    }

    /// Current phase.
    pub fn phase(&self) -> MatchPhase {
        self.lock_state().phase
    }

    /// Snapshot of the attempt state.
    pub fn snapshot(&self) -> MatchState {
        self.lock_state().clone()
    }

    /// Whether an attempt is in progress.
    pub fn is_open(&self) -> bool {
        self.close_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Request a signed ticket for `account_id`. Errors are not retried.
    pub async fn request_ticket(
        &self,
        access_token: &str,
        account_id: &str,
        session: &SessionDescriptor,
    ) -> Result<MatchmakingTicket, MatchmakingError> {
        let request = TicketRequest {
            account_id: account_id.to_string(),
            platform: self.config.platform.clone(),
            region: session.region.clone(),
            playlist: self.playlist_for(session),
            build_id: self.config.build_id.clone(),
        };
        self.set_phase(MatchPhase::TicketRequested);
        let ticket = self
            .api
            .request_ticket(access_token, &request)
            .await
            .map_err(MatchmakingError::Ticket)?;
        info!(
            ticket_type = %ticket.ticket_type,
            bucket = %request.bucket_id(),
            "Matchmaking ticket issued"
        );
        Ok(ticket)
    }

    /// Open the socket for `ticket`, retrying transport failures with a fixed backoff.
    pub async fn connect(
        &self,
        ticket: &MatchmakingTicket,
    ) -> Result<Box<dyn FrameStream>, MatchmakingError> {
        self.set_phase(MatchPhase::SocketConnecting);
        let client_id = generate_client_id(self.config.client_id_len);
        let authorization = format!(
            "{} {} {} {} {}",
            self.config.auth_scheme,
            ticket.ticket_type,
            ticket.payload,
            ticket.signature,
            client_id
        );

        let attempts = self.config.connect_attempts.max(1);
        let backoff = Duration::from_millis(self.config.connect_backoff_ms);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self
                .connector
                .connect(&ticket.service_url, &authorization)
                .await
            {
                Ok(stream) => {
                    info!(attempt, "Matchmaking socket open");
                    return Ok(stream);
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Matchmaking socket connect failed");
                    last_error = Some(e);
                    if attempt < attempts {
                        metrics::SOCKET_CONNECT_RETRIES.inc();
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(MatchmakingError::ConnectFailed {
            attempts,
            reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Run a full attempt for `session` and return the resolved match.
    ///
    /// Ends early with [`MatchmakingError::ClosedBeforeResolution`] when the
    /// socket closes or [`close`](Self::close) is called first.
    pub async fn run(
        &self,
        access_token: &str,
        account_id: &str,
        session: &SessionDescriptor,
    ) -> Result<MatchOutcome, MatchmakingError> {
        let (close_tx, mut close_rx) = watch::channel(false);
        {
            *self.lock_state() = MatchState::default();
            let previous = self
                .close_tx
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .replace(close_tx);
            if previous.is_some() {
                warn!("Replacing an open matchmaking attempt");
            }
        }

        let result = self
            .run_attempt(access_token, account_id, session, &mut close_rx)
            .await;
        if result.is_ok() {
            self.process.terminate().await;
        }
        self.finish();
        result
    }

    async fn run_attempt(
        &self,
        access_token: &str,
        account_id: &str,
        session: &SessionDescriptor,
        close_rx: &mut watch::Receiver<bool>,
    ) -> Result<MatchOutcome, MatchmakingError> {
        let ticket = tokio::select! {
            ticket = self.request_ticket(access_token, account_id, session) => ticket?,
            _ = closed(close_rx) => return Err(MatchmakingError::ClosedBeforeResolution),
        };

        let mut stream = tokio::select! {
            stream = self.connect(&ticket) => stream?,
            _ = closed(close_rx) => return Err(MatchmakingError::ClosedBeforeResolution),
        };
        self.set_phase(MatchPhase::Connecting);

        let result = self.read_loop(stream.as_mut(), close_rx, session).await;
        stream.close().await;
        result
    }

    async fn read_loop(
        &self,
        stream: &mut dyn FrameStream,
        close_rx: &mut watch::Receiver<bool>,
        session: &SessionDescriptor,
    ) -> Result<MatchOutcome, MatchmakingError> {
        loop {
            let frame = tokio::select! {
                frame = stream.next_frame() => frame,
                _ = closed(close_rx) => return Err(MatchmakingError::ClosedBeforeResolution),
            };
            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(e),
                None => {
                    info!("Matchmaking socket ended");
                    return Err(MatchmakingError::ClosedBeforeResolution);
                }
            };

            for message in self.ingest(&frame) {
                if let Step::Resolve {
                    session_id,
                    match_id,
                } = self.dispatch(message)
                {
                    return self.resolve(&session_id, &match_id, session).await;
                }
            }
        }
    }

    /// Split a frame into messages, reporting anomalies.
    fn ingest(&self, frame: &str) -> Vec<InboundMessage> {
        let split = split_frame(frame);
        for anomaly in &split.anomalies {
            metrics::FRAME_ANOMALIES.inc();
            match anomaly {
                FrameAnomaly::Unparseable { fragment, reason } => {
                    warn!(fragment = %fragment, reason = %reason, "Discarding malformed message")
                }
                FrameAnomaly::Unbalanced { fragment } => {
                    warn!(fragment = %fragment, "Discarding unterminated message")
                }
                FrameAnomaly::NotAnObject { fragment } => {
                    warn!(fragment = %fragment, "Discarding non-object message")
                }
            }
        }
        if split.messages.is_empty() {
            warn!(len = frame.len(), "Frame carried no parseable messages");
        }
        split
            .messages
            .into_iter()
            .map(InboundMessage::from_value)
            .collect()
    }

    fn dispatch(&self, message: InboundMessage) -> Step {
        let mut state = self.lock_state();
        match message {
            InboundMessage::Status(StatusUpdate::Connecting) => {
                state.phase = MatchPhase::Connecting;
                debug!("Matchmaking connecting");
            }
            InboundMessage::Status(StatusUpdate::Waiting {
                total_players,
                connected_players,
            }) => {
                state.phase = MatchPhase::Waiting;
                info!(
                    total_players = ?total_players,
                    connected_players = ?connected_players,
                    "Matchmaking waiting"
                );
            }
            InboundMessage::Status(StatusUpdate::Queued {
                ticket_id,
                queued_players,
                estimated_wait_sec,
            }) => {
                state.phase = MatchPhase::Queued;
                if state.ticket_id.is_none() {
                    state.ticket_id = ticket_id;
                }
                info!(
                    ticket_id = ?state.ticket_id,
                    queued_players = ?queued_players,
                    estimated_wait_sec = ?estimated_wait_sec,
                    "Matchmaking queued"
                );
            }
            InboundMessage::Status(StatusUpdate::SessionAssignment {
                match_id,
                session_id,
            }) => {
                state.phase = MatchPhase::SessionAssignment;
                return claim_resolution(&mut state, match_id, session_id, "SessionAssignment");
            }
            InboundMessage::Play {
                match_id,
                session_id,
            } => {
                state.phase = MatchPhase::Play;
                return claim_resolution(&mut state, match_id, session_id, "Play");
            }
            InboundMessage::Status(StatusUpdate::Other(other)) => {
                debug!(state = ?other, "Unhandled status update");
            }
            InboundMessage::Unknown { name } => {
                debug!(name = ?name, "Unhandled matchmaking message");
            }
        }
        Step::Continue
    }

    /// Look up the server, then hand the session to the backend exactly once.
    async fn resolve(
        &self,
        session_id: &str,
        match_id: &str,
        session: &SessionDescriptor,
    ) -> Result<MatchOutcome, MatchmakingError> {
        info!(session_id = %session_id, match_id = %match_id, "Resolving session");

        let server = match self.api.lookup_session(session_id, HeaderKind::Account).await {
            Ok(server) => server,
            Err(e) if e.is_unauthorized() => {
                warn!(session_id = %session_id, "Session lookup rejected, retrying with game credentials");
                self.api
                    .lookup_session(session_id, HeaderKind::Game)
                    .await
                    .map_err(MatchmakingError::Resolution)?
            }
            Err(e) => return Err(MatchmakingError::Resolution(e)),
        };

        let first = {
            let mut state = self.lock_state();
            state.phase = MatchPhase::Resolved;
            !std::mem::replace(&mut state.handed_off, true)
        };

        if first {
            let handoff = Handoff {
                session_id: session_id.to_string(),
                match_id: match_id.to_string(),
                server_address: server.server_address.clone(),
                server_port: server.server_port,
                region: session.region.clone(),
                playlist_name: self.playlist_for(session),
            };
            match self.backend.post_handoff(&handoff).await {
                Ok(()) => {
                    metrics::HANDOFFS.with_label_values(&["success"]).inc();
                    info!(
                        session_id = %session_id,
                        server = %format!("{}:{}", server.server_address, server.server_port),
                        "Session handed off"
                    );
                }
                Err(e) => {
                    metrics::HANDOFFS.with_label_values(&["error"]).inc();
                    return Err(MatchmakingError::Handoff(e));
                }
            }
        } else {
            debug!(session_id = %session_id, "Hand-off already sent");
        }

        Ok(MatchOutcome {
            session_id: session_id.to_string(),
            match_id: match_id.to_string(),
            server,
            handed_off: first,
        })
    }

    /// End the current attempt. Idempotent.
    pub fn close(&self) {
        let close_tx = self
            .close_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(tx) = close_tx {
            info!("Closing matchmaking");
            let _ = tx.send(true);
        }
        *self.lock_state() = MatchState {
            phase: MatchPhase::Closed,
            ..MatchState::default()
        };
    }

    fn finish(&self) {
        self.close_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.lock_state().phase = MatchPhase::Closed;
    }

    fn playlist_for(&self, session: &SessionDescriptor) -> String {
        if session.playlist_name.is_empty() {
            self.config.default_playlist.clone()
        } else {
            session.playlist_name.clone()
        }
    }
}

fn claim_resolution(
    state: &mut MatchState,
    match_id: Option<String>,
    session_id: Option<String>,
    source: &str,
) -> Step {
    if state.resolved {
        debug!(source, "Session already resolved, ignoring");
        return Step::Continue;
    }
    let Some(match_id) = match_id.or_else(|| session_id.clone()) else {
        warn!(source, "Assignment without match or session id");
        return Step::Continue;
    };
    let session_id = session_id.unwrap_or_else(|| match_id.clone());
    state.resolved = true;
    state.match_id = Some(match_id.clone());
    state.session_id = Some(session_id.clone());
    Step::Resolve {
        session_id,
        match_id,
    }
}

/// Resolves once the attempt has been closed (or its sender dropped).
async fn closed(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|closed| *closed).await.is_err() {
        debug!("Matchmaking close handle dropped");
    }
}

/// Random hex client identifier of `len` characters.
pub fn generate_client_id(len: usize) -> String {
    let bytes: [u8; 16] = rand::random();
    let mut id: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    id.truncate(len);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::testing::{
        fixtures, MockBackend, MockConnector, MockMatchmakingApi, MockProcessControl,
    };

    struct Harness {
        client: Arc<MatchmakingClient>,
        api: Arc<MockMatchmakingApi>,
        backend: Arc<MockBackend>,
        connector: Arc<MockConnector>,
        process: Arc<MockProcessControl>,
    }

    fn harness() -> Harness {
        let api = Arc::new(MockMatchmakingApi::new());
        let backend = Arc::new(MockBackend::new());
        let connector = Arc::new(MockConnector::new());
        let process = Arc::new(MockProcessControl::new());
        let client = Arc::new(MatchmakingClient::new(
            MatchmakingConfig {
                connect_backoff_ms: 10,
                ..MatchmakingConfig::default()
            },
            api.clone(),
            backend.clone(),
            connector.clone(),
            process.clone(),
        ));
        Harness {
            client,
            api,
            backend,
            connector,
            process,
        }
    }

    fn assignment(match_id: &str) -> String {
        format!(
            r#"{{"name":"StatusUpdate","payload":{{"state":"SessionAssignment","matchId":"{}"}}}}"#,
            match_id
        )
    }

    #[test]
    fn test_client_id_shape() {
        let id = generate_client_id(16);
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_client_id(16), generate_client_id(16));
    }

    #[tokio::test]
    async fn test_authorization_value() {
        let h = harness();
        h.connector.push_stream(vec![assignment("m-1")]).await;

        h.client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        let auth = h.connector.authorizations().await;
        assert_eq!(auth.len(), 1);
        let parts: Vec<&str> = auth[0].split(' ').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "Signed");
        assert_eq!(&parts[1..4], &["ticket-type", "ticket-payload", "ticket-signature"]);
        assert_eq!(parts[4].len(), 16);
    }

    #[tokio::test]
    async fn test_resolution_posts_once_and_terminates() {
        let h = harness();
        h.connector
            .push_stream(vec![
                r#"{"name":"StatusUpdate","payload":{"state":"Connecting"}}"#.to_string(),
                r#"{"name":"StatusUpdate","payload":{"state":"Queued","ticketId":"t-1"}}"#
                    .to_string(),
                format!(
                    "{}{}",
                    assignment("m-1"),
                    r#"{"name":"Play","payload":{"matchId":"m-1","sessionId":"m-1"}}"#
                ),
            ])
            .await;

        let outcome = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        assert_eq!(outcome.session_id, "m-1");
        assert_eq!(outcome.match_id, "m-1");
        assert!(outcome.handed_off);
        let posts = h.backend.handoffs().await;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].server_address, "10.0.0.1");
        assert_eq!(posts[0].region, "EU");
        assert_eq!(h.process.terminations(), 1);
        assert_eq!(h.connector.closed_streams(), 1);
        assert_eq!(h.client.phase(), MatchPhase::Closed);
        assert!(!h.client.is_open());
    }

    #[tokio::test]
    async fn test_two_assignments_post_once() {
        let h = harness();
        h.connector
            .push_stream(vec![assignment("m-1"), assignment("m-2")])
            .await;

        h.client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        assert_eq!(h.backend.handoffs().await.len(), 1);
        assert_eq!(h.api.lookups().await, vec![("m-1".to_string(), HeaderKind::Account)]);
    }

    #[tokio::test]
    async fn test_unauthorized_lookup_falls_back_once() {
        let h = harness();
        h.api
            .set_lookup_errors(vec![ServiceError::Unauthorized {
                endpoint: "session".into(),
            }])
            .await;
        h.connector.push_stream(vec![assignment("m-1")]).await;

        h.client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        assert_eq!(
            h.api.lookups().await,
            vec![
                ("m-1".to_string(), HeaderKind::Account),
                ("m-1".to_string(), HeaderKind::Game)
            ]
        );
        assert_eq!(h.backend.handoffs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_failure_gives_up() {
        let h = harness();
        h.api
            .set_lookup_errors(vec![
                ServiceError::Unauthorized {
                    endpoint: "session".into(),
                },
                ServiceError::Unauthorized {
                    endpoint: "session".into(),
                },
            ])
            .await;
        h.connector.push_stream(vec![assignment("m-1")]).await;

        let result = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await;

        assert!(matches!(result, Err(MatchmakingError::Resolution(_))));
        assert_eq!(h.api.lookups().await.len(), 2);
        assert!(h.backend.handoffs().await.is_empty());
        assert_eq!(h.process.terminations(), 0);
    }

    #[tokio::test]
    async fn test_malformed_fragment_keeps_connection() {
        let h = harness();
        h.connector
            .push_stream(vec![
                "garbage".to_string(),
                r#"{"name":"StatusUpdate","payload":{"state":"Waiting"}} {"na"#.to_string(),
                assignment("m-1"),
            ])
            .await;

        let outcome = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        assert_eq!(outcome.match_id, "m-1");
    }

    #[tokio::test]
    async fn test_stream_end_before_resolution() {
        let h = harness();
        h.connector.push_ending_stream(vec![]).await;

        let result = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await;

        assert!(matches!(result, Err(MatchmakingError::ClosedBeforeResolution)));
        assert_eq!(h.connector.closed_streams(), 1);
        assert_eq!(h.process.terminations(), 0);
    }

    #[tokio::test]
    async fn test_close_ends_run() {
        let h = harness();
        h.connector.push_stream(vec![]).await;

        let client = h.client.clone();
        let run = tokio::spawn(async move {
            client
                .run("token", "acc-1", &fixtures::session("s-1", false, 0))
                .await
        });
        while h.client.phase() != MatchPhase::Connecting {
            tokio::task::yield_now().await;
        }
        h.client.close();
        h.client.close();

        let result = run.await.unwrap();
        assert!(matches!(result, Err(MatchmakingError::ClosedBeforeResolution)));
        assert_eq!(h.connector.closed_streams(), 1);
        assert!(!h.client.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_then_fails() {
        let h = harness();
        h.connector.fail_next_connects(5).await;

        let result = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await;

        assert!(matches!(
            result,
            Err(MatchmakingError::ConnectFailed { attempts: 3, .. })
        ));
        assert_eq!(h.connector.connect_calls().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_recovers_on_retry() {
        let h = harness();
        h.connector.fail_next_connects(2).await;
        h.connector.push_stream(vec![assignment("m-1")]).await;

        h.client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await
            .unwrap();

        assert_eq!(h.connector.connect_calls().await, 3);
    }

    #[tokio::test]
    async fn test_ticket_failure_propagates() {
        let h = harness();
        h.api
            .set_ticket_error(ServiceError::Status {
                endpoint: "matchmaking ticket".into(),
                status: 500,
                body: String::new(),
            })
            .await;

        let result = h
            .client
            .run("token", "acc-1", &fixtures::session("s-1", false, 0))
            .await;

        assert!(matches!(result, Err(MatchmakingError::Ticket(_))));
        assert_eq!(h.connector.connect_calls().await, 0);
        assert_eq!(h.api.ticket_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ticket_request_uses_session_region_and_playlist() {
        let h = harness();
        h.connector.push_stream(vec![assignment("m-1")]).await;
        let mut session = fixtures::session("s-1", false, 0);
        session.region = "NAE".into();
        session.playlist_name = "duos".into();

        h.client.run("token", "acc-1", &session).await.unwrap();

        let requests = h.api.ticket_requests().await;
        assert_eq!(requests[0].account_id, "acc-1");
        assert_eq!(requests[0].region, "NAE");
        assert_eq!(requests[0].playlist, "duos");
    }
}
