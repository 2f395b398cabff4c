//! Mock game client collaborators.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::game_files::{GameFiles, GameFilesError};
use crate::services::ExchangeCredential;
use crate::supervisor::{
    GameProcess, GraceHook, LaunchedProcess, PidSource, ProcessControl, ProcessTable,
    SupervisorError, SupervisorStatus,
};

/// Mock implementation of [`ProcessTable`].
#[derive(Debug, Default)]
pub struct MockProcessTable {
    by_name: RwLock<Option<u32>>,
    alive: RwLock<HashSet<u32>>,
    killed: RwLock<Vec<u32>>,
}

impl MockProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pid reported for any executable name lookup.
    pub async fn set_running_by_name(&self, pid: Option<u32>) {
        *self.by_name.write().await = pid;
    }

    pub async fn set_alive(&self, pid: u32) {
        self.alive.write().await.insert(pid);
    }

    /// Every pid passed to `kill`, in order.
    pub async fn killed(&self) -> Vec<u32> {
        self.killed.read().await.clone()
    }
}

#[async_trait]
impl ProcessTable for MockProcessTable {
    async fn find_by_name(&self, _executable: &str) -> Result<Option<u32>, SupervisorError> {
        Ok(*self.by_name.read().await)
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.alive.read().await.contains(&pid)
    }

    async fn kill(&self, pid: u32) -> Result<(), SupervisorError> {
        self.killed.write().await.push(pid);
        self.alive.write().await.remove(&pid);
        Ok(())
    }
}

/// Mock implementation of [`ProcessControl`] counting terminations.
#[derive(Debug, Default)]
pub struct MockProcessControl {
    terminations: AtomicUsize,
}

impl MockProcessControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProcessControl for MockProcessControl {
    async fn terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock implementation of [`GameProcess`].
///
/// Launches succeed immediately with pid 4242 unless an error is queued.
/// The grace hook is stored so tests can fire it by hand.
pub struct MockGameProcess {
    launch_error: RwLock<Option<SupervisorError>>,
    ready: AtomicBool,
    running: AtomicBool,
    launches: RwLock<Vec<String>>,
    kills: AtomicUsize,
    terminations: AtomicUsize,
    hook: Mutex<Option<GraceHook>>,
}

impl Default for MockGameProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGameProcess {
    pub const PID: u32 = 4242;

    pub fn new() -> Self {
        Self {
            launch_error: RwLock::new(None),
            ready: AtomicBool::new(true),
            running: AtomicBool::new(false),
            launches: RwLock::new(Vec::new()),
            kills: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
            hook: Mutex::new(None),
        }
    }

    /// Configure the next launch to fail.
    pub async fn set_launch_error(&self, error: SupervisorError) {
        *self.launch_error.write().await = Some(error);
    }

    /// Whether `wait_until_ready` reports the client as up.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Exchange codes of every launch.
    pub async fn launched_codes(&self) -> Vec<String> {
        self.launches.read().await.clone()
    }

    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    pub fn has_grace_hook(&self) -> bool {
        self.hook.lock().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Invoke the registered grace hook. Returns false if none is set.
    pub fn fire_grace_hook(&self) -> bool {
        let hook = self.hook.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match hook {
            Some(hook) => {
                hook();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl GameProcess for MockGameProcess {
    async fn launch(
        &self,
        credential: &ExchangeCredential,
    ) -> Result<LaunchedProcess, SupervisorError> {
        self.launches.write().await.push(credential.code.clone());
        if let Some(error) = self.launch_error.write().await.take() {
            return Err(error);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(LaunchedProcess {
            pid: Self::PID,
            source: PidSource::ResultLine,
        })
    }

    async fn kill(&self) {
        self.kills.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
    }

    async fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> bool {
        self.running.load(Ordering::SeqCst) && self.ready.load(Ordering::SeqCst)
    }

    fn set_grace_hook(&self, hook: GraceHook) {
        *self.hook.lock().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    fn status(&self) -> SupervisorStatus {
        let running = self.running.load(Ordering::SeqCst);
        SupervisorStatus {
            launch_id: None,
            tracked_pid: running.then_some(Self::PID),
            pid_source: running.then_some(PidSource::ResultLine),
            helper_running: false,
            watchdog_armed: running,
            launched_at: None,
        }
    }
}

#[async_trait]
impl ProcessControl for MockGameProcess {
    async fn terminate(&self) {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        GameProcess::kill(self).await;
    }
}

/// Mock implementation of [`GameFiles`].
#[derive(Debug, Default)]
pub struct MockGameFiles {
    next_error: RwLock<Option<GameFilesError>>,
    prepared: AtomicUsize,
}

impl MockGameFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_next_error(&self, error: GameFilesError) {
        *self.next_error.write().await = Some(error);
    }

    pub fn prepare_count(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameFiles for MockGameFiles {
    async fn prepare(&self) -> Result<usize, GameFilesError> {
        self.prepared.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(0)
    }
}
