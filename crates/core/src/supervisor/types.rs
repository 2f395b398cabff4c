//! Types shared by the process supervisor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// Options file handed to the process-manager helper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchOptions {
    pub game_path: String,
    pub arguments: Vec<String>,
    pub auto_terminate: u64,
}

/// Which signal produced the tracked PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PidSource {
    /// `RESULT:{...}` line on helper stdout.
    ResultLine,
    /// `PID:<n>` found in helper stdout after it exited.
    StdoutPattern,
    /// OS process query by executable name.
    ProcessQuery,
}

impl PidSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PidSource::ResultLine => "result_line",
            PidSource::StdoutPattern => "stdout_pid",
            PidSource::ProcessQuery => "process_query",
        }
    }
}

/// A launched game client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LaunchedProcess {
    pub pid: u32,
    pub source: PidSource,
}

/// The `RESULT:` payload printed by the helper.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct HelperResult {
    pub client_pid: u32,
}

/// Single-assignment cell for the game client PID.
///
/// Three concurrent signals race to report the PID; the first one wins and
/// later writes are ignored.
#[derive(Debug)]
pub struct PidCell {
    tx: watch::Sender<Option<LaunchedProcess>>,
}

impl Default for PidCell {
    fn default() -> Self {
        Self::new()
    }
}

impl PidCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Record `pid` if nothing was recorded yet. Returns whether this call won.
    pub fn resolve(&self, pid: u32, source: PidSource) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(LaunchedProcess { pid, source });
            true
        })
    }

    pub fn get(&self) -> Option<LaunchedProcess> {
        *self.tx.borrow()
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Wait until a PID has been recorded.
    pub async fn wait(&self) -> LaunchedProcess {
        let mut rx = self.tx.subscribe();
        if let Ok(value) = rx.wait_for(Option::is_some).await {
            if let Some(launched) = *value {
                return launched;
            }
        }
        // The sender lives in `self`, so the channel cannot close while we wait.
        std::future::pending().await
    }
}

/// Snapshot of the supervisor state.
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorStatus {
    pub launch_id: Option<Uuid>,
    pub tracked_pid: Option<u32>,
    pub pid_source: Option<PidSource>,
    pub helper_running: bool,
    pub watchdog_armed: bool,
    pub launched_at: Option<DateTime<Utc>>,
}
