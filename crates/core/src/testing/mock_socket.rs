//! Mock matchmaking socket.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::matchmaking::{FrameStream, MatchmakingError, SocketConnector};

/// A scripted socket: yields its frames, then either ends or stays open.
#[derive(Debug)]
pub struct MockFrameStream {
    frames: VecDeque<String>,
    ends: bool,
    closed: bool,
    close_count: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameStream for MockFrameStream {
    async fn next_frame(&mut self) -> Option<Result<String, MatchmakingError>> {
        if self.closed {
            return None;
        }
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.ends {
            return None;
        }
        std::future::pending().await
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug)]
struct ScriptedStream {
    frames: Vec<String>,
    ends: bool,
}

/// Mock implementation of [`SocketConnector`].
///
/// Each successful connect hands out the next scripted stream; with nothing
/// queued it returns a stream that stays open and silent.
#[derive(Debug, Default)]
pub struct MockConnector {
    streams: RwLock<VecDeque<ScriptedStream>>,
    failures_left: RwLock<u32>,
    authorizations: RwLock<Vec<String>>,
    connect_calls: RwLock<usize>,
    closed: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream that delivers `frames` and then stays open.
    pub async fn push_stream(&self, frames: Vec<String>) {
        self.streams.write().await.push_back(ScriptedStream {
            frames,
            ends: false,
        });
    }

    /// Queue a stream that delivers `frames` and then ends.
    pub async fn push_ending_stream(&self, frames: Vec<String>) {
        self.streams
            .write()
            .await
            .push_back(ScriptedStream { frames, ends: true });
    }

    /// Fail the next `n` connects.
    pub async fn fail_next_connects(&self, n: u32) {
        *self.failures_left.write().await = n;
    }

    /// Authorization values of every connect, failed ones included.
    pub async fn authorizations(&self) -> Vec<String> {
        self.authorizations.read().await.clone()
    }

    pub async fn connect_calls(&self) -> usize {
        *self.connect_calls.read().await
    }

    /// Number of handed-out streams that have been closed.
    pub fn closed_streams(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(
        &self,
        _url: &str,
        authorization: &str,
    ) -> Result<Box<dyn FrameStream>, MatchmakingError> {
        *self.connect_calls.write().await += 1;
        self.authorizations
            .write()
            .await
            .push(authorization.to_string());

        {
            let mut failures = self.failures_left.write().await;
            if *failures > 0 {
                *failures -= 1;
                return Err(MatchmakingError::transport("connection refused"));
            }
        }

        let script = self
            .streams
            .write()
            .await
            .pop_front()
            .unwrap_or(ScriptedStream {
                frames: Vec::new(),
                ends: false,
            });
        Ok(Box::new(MockFrameStream {
            frames: script.frames.into(),
            ends: script.ends,
            closed: false,
            close_count: Arc::clone(&self.closed),
        }))
    }
}
