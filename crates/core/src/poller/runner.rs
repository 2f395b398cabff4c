//! Session poller implementation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::schedule::ScheduledTask;
use crate::services::{SessionDescriptor, SessionSource};

use super::config::PollerConfig;
use super::select::select_eligible;
use super::throttle::LogThrottle;

/// Callback invoked with a newly claimed session.
pub type SessionCallback = Arc<dyn Fn(SessionDescriptor) + Send + Sync>;

/// Snapshot of the poller's state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PollerStatus {
    pub running: bool,
    pub region: String,
    pub processed_count: usize,
    pub last_triggered_session_id: Option<String>,
    pub last_poll_at: Option<DateTime<Utc>>,
    pub polls: u64,
}

#[derive(Default)]
struct PollerState {
    running: bool,
    generation: Uuid,
    processed: HashSet<String>,
    last_triggered_session_id: Option<String>,
    callback: Option<SessionCallback>,
    loop_task: Option<ScheduledTask>,
    resume_task: Option<ScheduledTask>,
    reset_task: Option<ScheduledTask>,
    last_poll_at: Option<DateTime<Utc>>,
    polls: u64,
}

/// Periodically polls the session list and claims at most one session per
/// match.
pub struct SessionPoller {
    config: PollerConfig,
    source: Arc<dyn SessionSource>,
    state: Mutex<PollerState>,
    waiting_log: Mutex<LogThrottle>,
}

impl SessionPoller {
    pub fn new(config: PollerConfig, source: Arc<dyn SessionSource>) -> Self {
        let window = Duration::from_secs(config.waiting_log_window_secs);
        Self {
            config,
            source,
            state: Mutex::new(PollerState::default()),
            waiting_log: Mutex::new(LogThrottle::new(window)),
        }
    }

    fn state(&self) -> MutexGuard<'_, PollerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issue one list request and apply the selection rule.
    ///
    /// Network failures are logged and reported as "no eligible session".
    pub async fn poll(&self) -> Option<SessionDescriptor> {
        metrics::POLLS_TOTAL.inc();
        let result = self.source.list_sessions(&self.config.region).await;

        let processed = {
            let mut state = self.state();
            state.polls += 1;
            state.last_poll_at = Some(Utc::now());
            state.processed.clone()
        };

        let sessions = match result {
            Ok(sessions) => sessions,
            Err(e) => {
                metrics::POLL_ERRORS.inc();
                warn!(region = %self.config.region, "Session list request failed: {}", e);
                return None;
            }
        };

        let (session, tier) = select_eligible(&sessions, &processed)?;
        debug!(
            session_id = %session.session_id,
            tier = tier.as_str(),
            players = session.players,
            "Eligible session found"
        );
        metrics::ELIGIBLE_SESSIONS
            .with_label_values(&[tier.as_str()])
            .inc();
        Some(session.clone())
    }

    /// Start the polling loop, delivering claimed sessions to `on_eligible`.
    pub fn start_monitoring(self: &Arc<Self>, on_eligible: SessionCallback) {
        let mut state = self.state();
        state.callback = Some(on_eligible);

        if state.running {
            debug!("Session poller already running");
            return;
        }

        let generation = Uuid::new_v4();
        state.running = true;
        state.generation = generation;
        let poller = Arc::clone(self);
        state.loop_task = Some(ScheduledTask::spawn(
            generation,
            poller.monitor_loop(generation),
        ));

        if state.reset_task.is_none() && self.config.processed_reset_interval_secs > 0 {
            let poller = Arc::clone(self);
            let every = Duration::from_secs(self.config.processed_reset_interval_secs);
            state.reset_task = Some(ScheduledTask::spawn(Uuid::new_v4(), async move {
                let mut ticker = tokio::time::interval(every);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    poller.clear_processed();
                }
            }));
        }

        info!(
            region = %self.config.region,
            interval_ms = self.config.interval_ms,
            "Session monitoring started"
        );
    }

    async fn monitor_loop(self: Arc<Self>, generation: Uuid) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if !self.is_current(generation) {
                break;
            }

            let Some(session) = self.poll().await else {
                self.log_waiting();
                continue;
            };

            let callback = {
                let mut state = self.state();
                if !state.running || state.generation != generation {
                    return;
                }
                if !state.processed.insert(session.session_id.clone()) {
                    continue;
                }
                state.last_triggered_session_id = Some(session.session_id.clone());
                state.running = false;
                if let Some(task) = state.loop_task.take() {
                    task.detach();
                }
                state.callback.clone()
            };

            info!(
                session_id = %session.session_id,
                playlist = %session.playlist_name,
                "New eligible session, pausing monitoring"
            );
            if let Some(callback) = callback {
                callback(session);
            }
            break;
        }
    }

    fn is_current(&self, generation: Uuid) -> bool {
        let state = self.state();
        state.running && state.generation == generation
    }

    fn log_waiting(&self) {
        let ready = self
            .waiting_log
            .lock()
            .map(|mut t| t.ready())
            .unwrap_or(false);
        if ready {
            info!(region = %self.config.region, "Waiting for an eligible session");
        }
    }

    /// Stop polling. Idempotent; also cancels a pending resume.
    ///
    /// The processed-set reset keeps its own schedule across these pauses;
    /// only [`shutdown`](Self::shutdown) ends it.
    pub fn stop_monitoring(&self) {
        let mut state = self.state();
        let was_running = state.running;
        state.running = false;
        if let Some(task) = state.loop_task.take() {
            task.cancel();
        }
        if let Some(task) = state.resume_task.take() {
            task.cancel();
        }
        if was_running {
            info!("Session monitoring stopped");
        }
    }

    /// Stop polling for good, including the processed-set reset.
    pub fn shutdown(&self) {
        self.stop_monitoring();
        let reset = self.state().reset_task.take();
        if let Some(task) = reset {
            task.cancel();
            debug!("Processed set reset cancelled");
        }
    }

    pub fn has_reset_schedule(&self) -> bool {
        self.state().reset_task.is_some()
    }

    /// Resume monitoring with the last registered callback after `delay`.
    pub fn resume_after_delay(self: &Arc<Self>, delay: Duration) {
        let mut state = self.state();
        if state.callback.is_none() {
            warn!("Cannot resume session monitoring: no callback registered");
            return;
        }

        let key = Uuid::new_v4();
        let poller = Arc::clone(self);
        state.resume_task = Some(ScheduledTask::after(key, delay, async move {
            poller.resume(key);
        }));
        debug!(delay_ms = delay.as_millis() as u64, "Session monitoring resume scheduled");
    }

    fn resume(self: &Arc<Self>, key: Uuid) {
        let callback = {
            let mut state = self.state();
            match state.resume_task.take() {
                Some(task) if task.key() == key => task.detach(),
                other => {
                    state.resume_task = other;
                    return;
                }
            }
            state.callback.clone()
        };
        if let Some(callback) = callback {
            self.start_monitoring(callback);
        }
    }

    /// Forget every processed session id.
    pub fn clear_processed(&self) {
        let mut state = self.state();
        let cleared = state.processed.len();
        state.processed.clear();
        if cleared > 0 {
            info!(cleared, "Processed session set cleared");
        }
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_processed(&self, session_id: &str) -> bool {
        self.state().processed.contains(session_id)
    }

    pub fn has_pending_resume(&self) -> bool {
        self.state()
            .resume_task
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub fn status(&self) -> PollerStatus {
        let state = self.state();
        PollerStatus {
            running: state.running,
            region: self.config.region.clone(),
            processed_count: state.processed.len(),
            last_triggered_session_id: state.last_triggered_session_id.clone(),
            last_poll_at: state.last_poll_at,
            polls: state.polls,
        }
    }
}
