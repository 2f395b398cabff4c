//! Game file preparation before a launch.

mod config;
mod error;
mod fs;

pub use config::{GameFilesConfig, OverlayFile};
pub use error::GameFilesError;
pub use fs::FsGameFiles;

use async_trait::async_trait;

/// Prepares the game installation for a launch.
#[async_trait]
pub trait GameFiles: Send + Sync {
    /// Verify the installation and place overlay files. Returns the number of files copied.
    async fn prepare(&self) -> Result<usize, GameFilesError>;
}
