//! Game file configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file copied into the game directory before each launch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayFile {
    /// Source file on disk.
    pub source: PathBuf,
    /// Destination relative to the game executable's directory.
    pub destination: PathBuf,
}

/// Game file preparation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameFilesConfig {
    #[serde(default)]
    pub overlays: Vec<OverlayFile>,
}
