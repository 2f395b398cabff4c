//! Cancellable scheduled tasks keyed by the identity of their owner.
//!
//! Every timer in the crate (poll loops, watchdogs, delayed resumes) is a
//! [`ScheduledTask`]. Dropping or cancelling the task aborts it; the key lets
//! the timer's own callback verify it still belongs to the current attempt
//! before acting.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

/// A spawned task that is aborted when cancelled or dropped.
#[derive(Debug)]
pub struct ScheduledTask {
    key: Uuid,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn `fut` immediately.
    pub fn spawn<F>(key: Uuid, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            key,
            handle: Some(tokio::spawn(fut)),
        }
    }

    /// Spawn `fut` after `delay` has elapsed.
    pub fn after<F>(key: Uuid, delay: Duration, fut: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(key, async move {
            tokio::time::sleep(delay).await;
            fut.await;
        })
    }

    /// Identity of the owner that scheduled this task.
    pub fn key(&self) -> Uuid {
        self.key
    }

    /// Whether the task has run to completion (or was aborted).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Abort the task.
    pub fn cancel(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Release the task without aborting it.
    ///
    /// Used by a task that removes its own handle from shared state: aborting
    /// itself would cancel the work it is still doing.
    pub fn detach(mut self) {
        self.handle.take();
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
