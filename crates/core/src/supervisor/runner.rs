//! Game client launch and lifetime supervision.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::config::SupervisorConfig;
use super::process_table::ProcessTable;
use super::traits::{GameProcess, GraceHook, ProcessControl};
use super::types::{
    HelperResult, LaunchOptions, LaunchedProcess, PidCell, PidSource, SupervisorStatus,
};
use super::SupervisorError;
use crate::metrics;
use crate::schedule::ScheduledTask;
use crate::services::ExchangeCredential;

const RESULT_PREFIX: &str = "RESULT:";

/// How long to wait for buffered helper output after it exits.
const STDOUT_DRAIN: Duration = Duration::from_millis(500);

#[derive(Default)]
struct SupervisorState {
    launch_id: Option<Uuid>,
    pid: Option<LaunchedProcess>,
    helper_kill: Option<oneshot::Sender<()>>,
    watchdog: Option<ScheduledTask>,
    launched_at: Option<DateTime<Utc>>,
}

struct HelperExit {
    success: bool,
    code: Option<i32>,
}

struct Inner {
    config: SupervisorConfig,
    table: Arc<dyn ProcessTable>,
    state: Mutex<SupervisorState>,
    grace_hook: Mutex<Option<GraceHook>>,
}

/// Launches the game client through the process-manager helper and keeps
/// exactly one instance alive, bounded by a watchdog.
#[derive(Clone)]
pub struct ProcessSupervisor {
    inner: Arc<Inner>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, table: Arc<dyn ProcessTable>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                table,
                state: Mutex::new(SupervisorState::default()),
                grace_hook: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Check that the helper binary and the game executable exist.
    pub async fn verify_installation(&self) -> Result<(), SupervisorError> {
        let config = &self.inner.config;
        if !path_exists(&config.helper_path).await {
            return Err(SupervisorError::HelperNotFound {
                path: config.helper_path.clone(),
            });
        }
        if !path_exists(&config.game_path).await {
            return Err(SupervisorError::ExecutableNotFound {
                path: config.game_path.clone(),
            });
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, SupervisorState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn launch_inner(
        &self,
        credential: &ExchangeCredential,
    ) -> Result<LaunchedProcess, SupervisorError> {
        self.kill().await;
        self.kill_stray_instance().await;

        let config = &self.inner.config;
        let launch_id = Uuid::new_v4();

        write_options(config, credential).await?;

        let spawned = Command::new(&config.helper_path)
            .args(&config.helper_args)
            .arg(&config.options_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                remove_options(&config.options_path).await;
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    SupervisorError::HelperNotFound {
                        path: config.helper_path.clone(),
                    }
                } else {
                    SupervisorError::Io(e)
                });
            }
        };

        info!(
            launch_id = %launch_id,
            helper = %config.helper_path.display(),
            "Launching game client"
        );

        let cell = Arc::new(PidCell::new());
        let output = Arc::new(Mutex::new(String::new()));
        let (kill_tx, kill_rx) = oneshot::channel();
        let (exit_tx, mut exit_rx) = oneshot::channel();
        let started = Instant::now();

        {
            let mut state = self.state();
            state.launch_id = Some(launch_id);
            state.helper_kill = Some(kill_tx);
            state.launched_at = Some(Utc::now());
            state.watchdog = Some(self.arm_watchdog(launch_id));
        }

        let stdout_task = child.stdout.take().map(|stdout| {
            tokio::spawn(read_helper_stdout(
                stdout,
                Arc::clone(&cell),
                Arc::clone(&output),
            ))
        });
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_helper_stderr(stderr));
        }

        tokio::spawn(monitor_helper(HelperWatch {
            inner: Arc::downgrade(&self.inner),
            launch_id,
            child,
            kill_rx,
            stdout_task,
            output,
            cell: Arc::clone(&cell),
            exit_tx,
            options_path: config.options_path.clone(),
        }));

        let _pid_query = self.spawn_pid_query(launch_id, Arc::clone(&cell));

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        let settle = Duration::from_millis(config.helper_settle_ms);
        let mut helper_failure: Option<Option<i32>> = None;
        let mut exit_pending = true;

        let result = loop {
            tokio::select! {
                biased;
                launched = cell.wait() => break Ok(launched),
                exit = &mut exit_rx, if exit_pending => {
                    exit_pending = false;
                    match exit {
                        Ok(exit) if !exit.success => helper_failure = Some(exit.code),
                        Ok(_) => debug!("Helper exited cleanly, waiting for process query"),
                        Err(_) => debug!("Helper monitor ended without an exit status"),
                    }
                }
                _ = sleep_until(started + settle), if helper_failure.is_some() => {
                    break Err(SupervisorError::HelperFailed {
                        code: helper_failure.flatten(),
                    });
                }
                _ = sleep_until(started + launch_timeout) => {
                    break Err(SupervisorError::LaunchTimeout {
                        timeout_ms: config.launch_timeout_ms,
                    });
                }
            }
        };

        match result {
            Ok(launched) => {
                let current = {
                    let mut state = self.state();
                    let current = state.launch_id == Some(launch_id);
                    if current {
                        state.pid = Some(launched);
                    }
                    current
                };
                if !current {
                    warn!(pid = launched.pid, "Launch superseded, killing reported process");
                    self.kill_pid(launched.pid).await;
                    return Err(SupervisorError::Cancelled);
                }
                metrics::LAUNCHES
                    .with_label_values(&[launched.source.as_str()])
                    .inc();
                info!(
                    pid = launched.pid,
                    source = launched.source.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Game client launched"
                );
                Ok(launched)
            }
            Err(e) => {
                let label = match e {
                    SupervisorError::LaunchTimeout { .. } => "timeout",
                    _ => "helper_failed",
                };
                metrics::LAUNCHES.with_label_values(&[label]).inc();
                warn!(error = %e, "Game client launch failed");
                self.kill().await;
                Err(e)
            }
        }
    }

    /// Kill an instance running under the executable name that we do not track.
    async fn kill_stray_instance(&self) {
        let executable = self.inner.config.executable_name();
        if let Ok(Some(pid)) = self.inner.table.find_by_name(&executable).await {
            warn!(pid, executable = %executable, "Killing untracked game client");
            self.kill_pid(pid).await;
        }
    }

    async fn kill_pid(&self, pid: u32) {
        if let Err(e) = self.inner.table.kill(pid).await {
            warn!(pid, error = %e, "Failed to kill game client");
        }
    }

    fn arm_watchdog(&self, launch_id: Uuid) -> ScheduledTask {
        let grace = Duration::from_millis(self.inner.config.watchdog_grace_ms);
        let kill_after = Duration::from_millis(self.inner.config.watchdog_kill_ms);
        let weak = Arc::downgrade(&self.inner);

        ScheduledTask::spawn(launch_id, async move {
            sleep(grace).await;
            match weak.upgrade() {
                Some(inner) => ProcessSupervisor { inner }.on_watchdog_grace(launch_id),
                None => return,
            }
            sleep(kill_after.saturating_sub(grace)).await;
            if let Some(inner) = weak.upgrade() {
                ProcessSupervisor { inner }
                    .on_watchdog_expired(launch_id)
                    .await;
            }
        })
    }

    fn on_watchdog_grace(&self, launch_id: Uuid) {
        if self.state().launch_id != Some(launch_id) {
            debug!(launch_id = %launch_id, "Stale watchdog grace ignored");
            return;
        }
        warn!(launch_id = %launch_id, "Watchdog grace period elapsed");
        let hook = self
            .inner
            .grace_hook
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    async fn on_watchdog_expired(&self, launch_id: Uuid) {
        let watchdog = {
            let mut state = self.state();
            if state.launch_id != Some(launch_id) {
                debug!(launch_id = %launch_id, "Stale watchdog expiry ignored");
                return;
            }
            state.watchdog.take()
        };
        // This runs inside the watchdog task itself.
        if let Some(task) = watchdog {
            task.detach();
        }
        metrics::WATCHDOG_KILLS.inc();
        error!(launch_id = %launch_id, "Watchdog expired, killing game client");
        self.kill().await;
    }

    fn spawn_pid_query(&self, launch_id: Uuid, cell: Arc<PidCell>) -> ScheduledTask {
        let table = Arc::clone(&self.inner.table);
        let executable = self.inner.config.executable_name();
        let interval = Duration::from_millis(self.inner.config.process_query_interval_ms.max(1));

        ScheduledTask::spawn(launch_id, async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while !cell.is_resolved() {
                ticker.tick().await;
                match table.find_by_name(&executable).await {
                    Ok(Some(pid)) => {
                        if cell.resolve(pid, PidSource::ProcessQuery) {
                            debug!(pid, "PID found by process query");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => debug!(error = %e, "Process query failed"),
                }
            }
        })
    }
}

#[async_trait]
impl GameProcess for ProcessSupervisor {
    async fn launch(
        &self,
        credential: &ExchangeCredential,
    ) -> Result<LaunchedProcess, SupervisorError> {
        self.launch_inner(credential).await
    }

    async fn kill(&self) {
        let (pid, helper_kill, watchdog) = {
            let mut state = self.state();
            state.launch_id = None;
            state.launched_at = None;
            (
                state.pid.take(),
                state.helper_kill.take(),
                state.watchdog.take(),
            )
        };

        if let Some(task) = watchdog {
            task.cancel();
        }
        if let Some(tx) = helper_kill {
            let _ = tx.send(());
        }
        if let Some(launched) = pid {
            info!(pid = launched.pid, "Killing game client");
            self.kill_pid(launched.pid).await;
        }
    }

    async fn is_running(&self) -> bool {
        let (tracked, launching) = {
            let state = self.state();
            (state.pid.map(|p| p.pid), state.launch_id.is_some())
        };
        if let Some(pid) = tracked {
            return self.inner.table.is_alive(pid).await;
        }

        let executable = self.inner.config.executable_name();
        match self.inner.table.find_by_name(&executable).await {
            Ok(Some(pid)) => {
                if launching {
                    let mut state = self.state();
                    if state.pid.is_none() && state.launch_id.is_some() {
                        state.pid = Some(LaunchedProcess {
                            pid,
                            source: PidSource::ProcessQuery,
                        });
                    }
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!(error = %e, "Process query failed");
                false
            }
        }
    }

    async fn wait_until_ready(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        let poll = Duration::from_millis(self.inner.config.ready_poll_interval_ms.max(1));
        loop {
            if self.is_running().await {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(poll.min(deadline - now)).await;
        }
    }

    fn set_grace_hook(&self, hook: GraceHook) {
        *self
            .inner
            .grace_hook
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    fn status(&self) -> SupervisorStatus {
        let state = self.state();
        SupervisorStatus {
            launch_id: state.launch_id,
            tracked_pid: state.pid.map(|p| p.pid),
            pid_source: state.pid.map(|p| p.source),
            helper_running: state.helper_kill.is_some(),
            watchdog_armed: state.watchdog.is_some(),
            launched_at: state.launched_at,
        }
    }
}

#[async_trait]
impl ProcessControl for ProcessSupervisor {
    async fn terminate(&self) {
        self.kill().await;
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn write_options(
    config: &SupervisorConfig,
    credential: &ExchangeCredential,
) -> Result<(), SupervisorError> {
    let options = LaunchOptions {
        game_path: config.game_path.to_string_lossy().to_string(),
        arguments: config.build_arguments(&credential.code),
        auto_terminate: config.auto_terminate_secs,
    };
    let options_error = |reason: String| SupervisorError::OptionsWrite {
        path: config.options_path.clone(),
        reason,
    };
    let body = serde_json::to_vec_pretty(&options).map_err(|e| options_error(e.to_string()))?;
    tokio::fs::write(&config.options_path, body)
        .await
        .map_err(|e| options_error(e.to_string()))
}

async fn remove_options(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove launch options");
        }
    }
}

/// Parse a `RESULT:{"clientPid":n}` helper line.
fn parse_result_line(line: &str) -> Option<u32> {
    let payload = line.trim().strip_prefix(RESULT_PREFIX)?;
    match serde_json::from_str::<HelperResult>(payload.trim()) {
        Ok(result) => Some(result.client_pid),
        Err(e) => {
            warn!(error = %e, "Malformed helper result line");
            None
        }
    }
}

/// First `PID:<n>` marker in helper output.
fn find_pid_marker(output: &str) -> Option<u32> {
    let re = Regex::new(r"PID:\s*(\d+)").ok()?;
    re.captures(output)?.get(1)?.as_str().parse().ok()
}

async fn read_helper_stdout(
    stdout: impl AsyncRead + Unpin,
    cell: Arc<PidCell>,
    output: Arc<Mutex<String>>,
) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!(line = %line, "helper stdout");
        if let Some(pid) = parse_result_line(&line) {
            if cell.resolve(pid, PidSource::ResultLine) {
                debug!(pid, "PID reported by helper");
            }
        }
        let mut buffer = output.lock().unwrap_or_else(|e| e.into_inner());
        buffer.push_str(&line);
        buffer.push('\n');
    }
}

async fn log_helper_stderr(stderr: impl AsyncRead + Unpin) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(line = %line, "helper stderr");
    }
}

struct HelperWatch {
    inner: Weak<Inner>,
    launch_id: Uuid,
    child: Child,
    kill_rx: oneshot::Receiver<()>,
    stdout_task: Option<JoinHandle<()>>,
    output: Arc<Mutex<String>>,
    cell: Arc<PidCell>,
    exit_tx: oneshot::Sender<HelperExit>,
    options_path: PathBuf,
}

/// Wait for the helper to exit (or be killed), then run the stdout PID
/// fallback and report the exit status.
async fn monitor_helper(watch: HelperWatch) {
    let HelperWatch {
        inner,
        launch_id,
        mut child,
        kill_rx,
        stdout_task,
        output,
        cell,
        exit_tx,
        options_path,
    } = watch;

    let status = tokio::select! {
        status = child.wait() => status.ok(),
        _ = kill_rx => {
            debug!(launch_id = %launch_id, "Killing process helper");
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Helper already gone");
            }
            if let Some(task) = &stdout_task {
                task.abort();
            }
            None
        }
    };

    if let Some(mut task) = stdout_task {
        if timeout(STDOUT_DRAIN, &mut task).await.is_err() {
            debug!("Helper output still open after exit");
        }
    }

    remove_options(&options_path).await;

    if !cell.is_resolved() {
        let text = output.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(pid) = find_pid_marker(&text) {
            if cell.resolve(pid, PidSource::StdoutPattern) {
                debug!(pid, "PID found in helper output");
            }
        }
    }

    if let Some(inner) = inner.upgrade() {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.launch_id == Some(launch_id) {
            state.helper_kill = None;
        }
    }

    let (success, code) = match status {
        Some(status) => (status.success(), status.code()),
        None => (false, None),
    };
    debug!(launch_id = %launch_id, success, code = ?code, "Process helper exited");
    let _ = exit_tx.send(HelperExit { success, code });
}
