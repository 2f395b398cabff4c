//! Game process control seam.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{LaunchedProcess, SupervisorError, SupervisorStatus};
use crate::services::ExchangeCredential;

/// Called when the watchdog grace period elapses for the current launch.
pub type GraceHook = Arc<dyn Fn() + Send + Sync>;

/// Launches and controls the single game client instance.
#[async_trait]
pub trait GameProcess: Send + Sync {
    /// Kill any previous instance and launch a new one authenticated with
    /// `credential`. Resolves once a PID is known.
    async fn launch(&self, credential: &ExchangeCredential)
        -> Result<LaunchedProcess, SupervisorError>;

    /// Kill the tracked client, the helper and the watchdog. Idempotent.
    async fn kill(&self);

    /// Whether the client is alive.
    async fn is_running(&self) -> bool;

    /// Poll until the client is running or `timeout` elapses.
    async fn wait_until_ready(&self, timeout: Duration) -> bool;

    /// Install the hook invoked at the watchdog grace mark.
    fn set_grace_hook(&self, hook: GraceHook);

    /// Current state.
    fn status(&self) -> SupervisorStatus;
}

/// Narrow handle used by the matchmaking client to end the game client once
/// a session has been handed off.
#[async_trait]
pub trait ProcessControl: Send + Sync {
    async fn terminate(&self);
}
