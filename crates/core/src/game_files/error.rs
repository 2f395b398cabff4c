//! Error types for game file preparation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing game files.
#[derive(Debug, Error)]
pub enum GameFilesError {
    /// Game executable is missing.
    #[error("Game executable not found: {path}")]
    ExecutableNotFound { path: PathBuf },

    /// Overlay source file is missing.
    #[error("Overlay source not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Overlay destination escapes the game directory.
    #[error("Overlay destination must be a relative path inside the game directory: {path}")]
    InvalidDestination { path: PathBuf },

    /// Copy failed.
    #[error("Failed to copy {source_path} to {destination}: {reason}")]
    CopyFailed {
        source_path: PathBuf,
        destination: PathBuf,
        reason: String,
    },
}

impl GameFilesError {
    pub fn copy_failed(
        source_path: PathBuf,
        destination: PathBuf,
        error: std::io::Error,
    ) -> Self {
        Self::CopyFailed {
            source_path,
            destination,
            reason: error.to_string(),
        }
    }
}
