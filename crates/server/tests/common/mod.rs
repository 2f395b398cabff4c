//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process with
//! an orchestrator whose collaborators are all mocks, so the API can be
//! exercised without a game client or remote services.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use matchlink_core::{
    load_config_from_str,
    testing::{
        MockAccountApi, MockBackend, MockConnector, MockGameFiles, MockGameProcess,
        MockMatchmakingApi, MockSessionSource,
    },
    MatchContext, MatchOrchestrator, MatchmakingClient, SessionPoller, TokenStore,
};
use matchlink_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use matchlink_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[services]
account_base_url = "https://account.example.com"
game_base_url = "https://game.example.com"

[credentials]
account_token = "account-secret"
client_id = "client"
client_secret = "client-secret"

[backend]
url = "https://backend.example.com/handoff"
api_key = "backend-secret"

[supervisor]
helper_path = "/opt/matchlink/helper"
game_path = "/games/client/Game.exe"

[poller]
interval_ms = 20

[orchestrator]
enabled = false
settle_delay_ms = 0
failure_cooldown_ms = 50
success_resume_delay_ms = 50
"#;

/// Test fixture for API testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The orchestrator behind the router
    pub orchestrator: Arc<MatchOrchestrator>,
    /// Mock session list - configure polled sessions
    pub source: Arc<MockSessionSource>,
    /// Mock socket - script matchmaking frames
    pub connector: Arc<MockConnector>,
    /// Mock backend - inspect hand-offs
    pub backend: Arc<MockBackend>,
    /// Mock game client
    pub process: Arc<MockGameProcess>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let config = load_config_from_str(TEST_CONFIG).expect("Failed to parse test config");

        let source = Arc::new(MockSessionSource::new());
        let api = Arc::new(MockMatchmakingApi::new());
        let backend = Arc::new(MockBackend::new());
        let connector = Arc::new(MockConnector::new());
        let process = Arc::new(MockGameProcess::new());
        let tokens = Arc::new(TokenStore::new("account.example.com", "game.example.com"));
        tokens.set_token("account-secret");

        let poller = Arc::new(SessionPoller::new(config.poller.clone(), source.clone()));
        let matchmaking = Arc::new(MatchmakingClient::new(
            config.matchmaking.clone(),
            api,
            backend.clone(),
            connector.clone(),
            process.clone(),
        ));
        let ctx = MatchContext {
            tokens,
            poller,
            accounts: Arc::new(MockAccountApi::new()),
            process: process.clone(),
            matchmaking,
            game_files: Arc::new(MockGameFiles::new()),
        };
        let orchestrator = Arc::new(MatchOrchestrator::new(config.orchestrator.clone(), ctx));

        let state = Arc::new(AppState::new(config, Arc::clone(&orchestrator)));
        let router = create_router(state);

        Self {
            router,
            orchestrator,
            source,
            connector,
            backend,
            process,
        }
    }

    /// Send a GET request to the test router.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}
