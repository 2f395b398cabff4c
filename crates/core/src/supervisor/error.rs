//! Error types for the process supervisor.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while launching or controlling the game client.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Helper binary not found.
    #[error("Process helper not found at path: {path}")]
    HelperNotFound { path: PathBuf },

    /// Game client executable not found.
    #[error("Game executable not found at path: {path}")]
    ExecutableNotFound { path: PathBuf },

    /// The launch options file could not be written.
    #[error("Failed to write launch options to {path}: {reason}")]
    OptionsWrite { path: PathBuf, reason: String },

    /// No PID was reported within the launch timeout.
    #[error("Launch timed out after {timeout_ms} ms")]
    LaunchTimeout { timeout_ms: u64 },

    /// The helper exited unsuccessfully without reporting a PID.
    #[error("Process helper failed (exit code {code:?})")]
    HelperFailed { code: Option<i32> },

    /// The launch was superseded by a kill or another launch.
    #[error("Launch cancelled")]
    Cancelled,

    /// An OS process query or kill failed.
    #[error("Process query failed: {0}")]
    ProcessQuery(String),

    /// I/O error while spawning or talking to the helper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
