//! Match orchestrator implementation.
//!
//! One attempt is a linear pipeline:
//! prepare game files → mint exchange credential → kill + launch →
//! wait until ready + settle → in-game authenticate → matchmaking.
//!
//! Any failure runs the compensation path (kill the client, close
//! matchmaking) and resumes the poller after a cooldown. A resolved attempt
//! resumes the poller after a short delay.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::matchmaking::MatchOutcome;
use crate::metrics;
use crate::schedule::ScheduledTask;
use crate::services::SessionDescriptor;

use super::config::OrchestratorConfig;
use super::context::MatchContext;
use super::types::{AttemptSummary, OrchestratorError, OrchestratorStatus};

#[derive(Default)]
struct AttemptStats {
    current_session: Option<String>,
    attempts: u64,
    resolved: u64,
    failed: u64,
    last_attempt: Option<AttemptSummary>,
}

/// Drives match attempts for sessions claimed by the poller.
pub struct MatchOrchestrator {
    config: OrchestratorConfig,
    ctx: MatchContext,

    // Runtime state
    running: AtomicBool,
    stopped: AtomicBool,
    attempt_lock: tokio::sync::Mutex<()>,
    stats: Mutex<AttemptStats>,
    shutdown_tx: broadcast::Sender<()>,
    /// Bumped each time the watchdog grace period elapses.
    watchdog_tx: Arc<watch::Sender<u64>>,
    attempt_loop: Mutex<Option<ScheduledTask>>,
}

impl MatchOrchestrator {
    /// Create a new orchestrator. The watchdog grace hook closes matchmaking
    /// and ends whatever attempt stage is in flight.
    pub fn new(config: OrchestratorConfig, ctx: MatchContext) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let watchdog_tx = Arc::new(watch::channel(0u64).0);

        let matchmaking = Arc::clone(&ctx.matchmaking);
        let watchdog = Arc::clone(&watchdog_tx);
        ctx.process.set_grace_hook(Arc::new(move || {
            warn!("Watchdog grace elapsed, closing matchmaking");
            matchmaking.close();
            watchdog.send_modify(|fired| *fired = fired.wrapping_add(1));
        }));

        Self {
            config,
            ctx,
            running: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            attempt_lock: tokio::sync::Mutex::new(()),
            stats: Mutex::new(AttemptStats::default()),
            shutdown_tx,
            watchdog_tx,
            attempt_loop: Mutex::new(None),
        }
    }

    fn stats(&self) -> MutexGuard<'_, AttemptStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start polling and the attempt loop.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }
        self.stopped.store(false, Ordering::SeqCst);

        info!("Starting match orchestrator");

        let (session_tx, session_rx) = mpsc::unbounded_channel();
        self.spawn_attempt_loop(session_rx);

        self.ctx.poller.start_monitoring(Arc::new(move |session| {
            if session_tx.send(session).is_err() {
                debug!("Attempt loop gone, dropping claimed session");
            }
        }));

        info!("Match orchestrator started");
    }

    /// Attempts run one at a time: the loop awaits each before taking the next.
    fn spawn_attempt_loop(
        self: &Arc<Self>,
        mut sessions: mpsc::UnboundedReceiver<SessionDescriptor>,
    ) {
        let orchestrator = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let task = ScheduledTask::spawn(Uuid::new_v4(), async move {
            info!("Attempt loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Attempt loop received shutdown signal");
                        break;
                    }
                    session = sessions.recv() => {
                        let Some(session) = session else { break };
                        if !orchestrator.running.load(Ordering::SeqCst) {
                            break;
                        }
                        // Outcome is recorded in stats and logged by run_attempt.
                        let _ = orchestrator.run_attempt(session).await;
                    }
                }
            }
            info!("Attempt loop stopped");
        });

        *self.attempt_loop.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);
    }

    /// Run one full attempt for `session`, with compensation on failure.
    pub async fn run_attempt(
        &self,
        session: SessionDescriptor,
    ) -> Result<MatchOutcome, OrchestratorError> {
        let _guard = self.attempt_lock.lock().await;
        // Subscribed before the flag check: a concurrent stop() shows up in one or the other.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut watchdog_rx = self.watchdog_tx.subscribe();
        if self.stopped.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Stopped);
        }
        self.ctx.poller.stop_monitoring();

        let started = Instant::now();
        let started_at = Utc::now();
        {
            let mut stats = self.stats();
            stats.attempts += 1;
            stats.current_session = Some(session.session_id.clone());
        }
        info!(
            session_id = %session.session_id,
            region = %session.region,
            playlist = %session.playlist_name,
            "Match attempt started"
        );

        // A pipeline that finishes on the same wakeup as the watchdog (socket
        // closed by the grace hook) reports its own error.
        let result = tokio::select! {
            biased;
            _ = shutdown_rx.recv() => Err(OrchestratorError::Stopped),
            result = self.pipeline(&session) => result,
            _ = watchdog_rx.changed() => Err(OrchestratorError::WatchdogExpired),
        };

        let elapsed = started.elapsed().as_secs_f64();
        match &result {
            Ok(outcome) => {
                metrics::ATTEMPTS.with_label_values(&["resolved"]).inc();
                metrics::ATTEMPT_DURATION
                    .with_label_values(&["resolved"])
                    .observe(elapsed);
                info!(
                    session_id = %outcome.session_id,
                    match_id = %outcome.match_id,
                    server = %format!("{}:{}", outcome.server.server_address, outcome.server.server_port),
                    elapsed_secs = elapsed,
                    "Match attempt resolved"
                );
                self.resume_polling(Duration::from_millis(self.config.success_resume_delay_ms));
            }
            Err(e) => {
                metrics::ATTEMPTS.with_label_values(&["failed"]).inc();
                metrics::ATTEMPT_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                warn!(
                    session_id = %session.session_id,
                    stage = e.stage(),
                    category = e.category().as_str(),
                    error = %e,
                    "Match attempt failed, compensating"
                );
                self.compensate().await;
                self.resume_polling(Duration::from_millis(self.config.failure_cooldown_ms));
            }
        }

        self.record(&session, started_at, &result);
        result
    }

    async fn pipeline(
        &self,
        session: &SessionDescriptor,
    ) -> Result<MatchOutcome, OrchestratorError> {
        let prepared = self.ctx.game_files.prepare().await?;
        debug!(files = prepared, "Game files ready");

        let credential = self
            .ctx
            .accounts
            .mint_exchange_code()
            .await
            .map_err(OrchestratorError::Mint)?;
        debug!(expires_in = credential.expires_in, "Exchange credential minted");

        self.ctx.process.kill().await;
        let launched = self.ctx.process.launch(&credential).await?;
        info!(pid = launched.pid, "Game client started");

        let ready_timeout = Duration::from_millis(self.config.ready_timeout_ms);
        if !self.ctx.process.wait_until_ready(ready_timeout).await {
            return Err(OrchestratorError::NotReady {
                timeout_ms: self.config.ready_timeout_ms,
            });
        }
        tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let game = self
            .ctx
            .accounts
            .authenticate(credential)
            .await
            .map_err(OrchestratorError::Authenticate)?;
        info!(
            account_id = %game.account_id,
            display_name = %game.display_name,
            "In-game session established"
        );

        let outcome = self
            .ctx
            .matchmaking
            .run(&game.access_token, &game.account_id, session)
            .await?;
        Ok(outcome)
    }

    /// Kill the client, close matchmaking, and drop the in-game token.
    async fn compensate(&self) {
        self.ctx.process.kill().await;
        self.ctx.matchmaking.close();
        self.ctx.tokens.clear_access_token();
    }

    fn resume_polling(&self, delay: Duration) {
        if self.stopped.load(Ordering::SeqCst) {
            debug!("Orchestrator stopped, not resuming polling");
            return;
        }
        self.ctx.poller.resume_after_delay(delay);
    }

    fn record(
        &self,
        session: &SessionDescriptor,
        started_at: DateTime<Utc>,
        result: &Result<MatchOutcome, OrchestratorError>,
    ) {
        let mut stats = self.stats();
        stats.current_session = None;
        let summary = match result {
            Ok(outcome) => {
                stats.resolved += 1;
                AttemptSummary {
                    session_id: session.session_id.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    resolved: true,
                    match_id: Some(outcome.match_id.clone()),
                    server: Some(format!(
                        "{}:{}",
                        outcome.server.server_address, outcome.server.server_port
                    )),
                    failed_stage: None,
                    category: None,
                    error: None,
                }
            }
            Err(e) => {
                stats.failed += 1;
                AttemptSummary {
                    session_id: session.session_id.clone(),
                    started_at,
                    finished_at: Utc::now(),
                    resolved: false,
                    match_id: None,
                    server: None,
                    failed_stage: Some(e.stage()),
                    category: Some(e.category()),
                    error: Some(e.to_string()),
                }
            }
        };
        stats.last_attempt = Some(summary);
    }

    /// Stop polling, abort any attempt in flight and run compensation.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Orchestrator was not running");
        }

        info!("Stopping match orchestrator");

        let _ = self.shutdown_tx.send(());
        self.ctx.poller.shutdown();
        self.compensate().await;

        // Wait for an in-flight attempt to finish its own compensation.
        let _guard = self.attempt_lock.lock().await;
        self.ctx.poller.shutdown();
        if let Some(task) = self
            .attempt_loop
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            task.cancel();
        }

        info!("Match orchestrator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let stats = self.stats();
        OrchestratorStatus {
            running: self.running.load(Ordering::SeqCst),
            attempt_in_progress: stats.current_session.is_some(),
            current_session: stats.current_session.clone(),
            attempts: stats.attempts,
            resolved: stats.resolved,
            failed: stats.failed,
            last_attempt: stats.last_attempt.clone(),
            has_account_token: self.ctx.tokens.has_token(),
            poller: self.ctx.poller.status(),
            process: self.ctx.process.status(),
            matchmaking: self.ctx.matchmaking.snapshot(),
        }
    }

    pub fn context(&self) -> &MatchContext {
        &self.ctx
    }
}
