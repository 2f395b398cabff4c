//! Orchestrator API handlers.

use axum::{extract::State, Json};
use matchlink_core::OrchestratorStatus;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

/// Orchestrator, poller, process and matchmaking status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status())
}

/// Start polling and match attempts
pub async fn start(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().start();
    message("Orchestrator started")
}

/// Stop polling and abort any attempt in flight
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().stop().await;
    message("Orchestrator stopped")
}

/// Forget every processed session id
pub async fn clear_processed(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().context().poller.clear_processed();
    message("Processed sessions cleared")
}

/// Close the current matchmaking attempt
pub async fn close_matchmaking(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.orchestrator().context().matchmaking.close();
    message("Matchmaking closed")
}
