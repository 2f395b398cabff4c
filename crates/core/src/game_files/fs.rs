//! File system game file preparation.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::config::GameFilesConfig;
use super::error::GameFilesError;
use super::GameFiles;

/// Prepares a local game installation.
pub struct FsGameFiles {
    config: GameFilesConfig,
    game_path: PathBuf,
}

impl FsGameFiles {
    pub fn new(config: GameFilesConfig, game_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            game_path: game_path.into(),
        }
    }

    fn game_dir(&self) -> &Path {
        self.game_path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn resolve_destination(&self, relative: &Path) -> Result<PathBuf, GameFilesError> {
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(GameFilesError::InvalidDestination {
                path: relative.to_path_buf(),
            });
        }
        Ok(self.game_dir().join(relative))
    }
}

#[async_trait]
impl GameFiles for FsGameFiles {
    async fn prepare(&self) -> Result<usize, GameFilesError> {
        if !fs::try_exists(&self.game_path).await.unwrap_or(false) {
            return Err(GameFilesError::ExecutableNotFound {
                path: self.game_path.clone(),
            });
        }

        let mut copied = 0;
        for overlay in &self.config.overlays {
            let destination = self.resolve_destination(&overlay.destination)?;
            if !fs::try_exists(&overlay.source).await.unwrap_or(false) {
                return Err(GameFilesError::SourceNotFound {
                    path: overlay.source.clone(),
                });
            }

            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    GameFilesError::copy_failed(overlay.source.clone(), destination.clone(), e)
                })?;
            }

            let bytes = fs::copy(&overlay.source, &destination).await.map_err(|e| {
                GameFilesError::copy_failed(overlay.source.clone(), destination.clone(), e)
            })?;
            debug!(
                source = %overlay.source.display(),
                destination = %destination.display(),
                bytes,
                "Overlay file placed"
            );
            copied += 1;
        }

        if copied > 0 {
            info!(count = copied, "Game files prepared");
        }
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_files::OverlayFile;
    use tempfile::TempDir;

    fn install(dir: &TempDir) -> PathBuf {
        let game = dir.path().join("game").join("Game.exe");
        std::fs::create_dir_all(game.parent().unwrap()).unwrap();
        std::fs::write(&game, b"binary").unwrap();
        game
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let files = FsGameFiles::new(GameFilesConfig::default(), dir.path().join("Game.exe"));
        assert!(matches!(
            files.prepare().await,
            Err(GameFilesError::ExecutableNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_copies_overlays() {
        let dir = TempDir::new().unwrap();
        let game = install(&dir);
        let source = dir.path().join("Engine.ini");
        std::fs::write(&source, b"[Core]\nquality=low\n").unwrap();

        let config = GameFilesConfig {
            overlays: vec![OverlayFile {
                source: source.clone(),
                destination: PathBuf::from("Config/Engine.ini"),
            }],
        };
        let files = FsGameFiles::new(config, &game);

        assert_eq!(files.prepare().await.unwrap(), 1);
        let placed = dir.path().join("game").join("Config").join("Engine.ini");
        assert_eq!(std::fs::read(placed).unwrap(), b"[Core]\nquality=low\n");

        // Running again overwrites in place.
        assert_eq!(files.prepare().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_overlay_source() {
        let dir = TempDir::new().unwrap();
        let game = install(&dir);
        let config = GameFilesConfig {
            overlays: vec![OverlayFile {
                source: dir.path().join("missing.ini"),
                destination: PathBuf::from("missing.ini"),
            }],
        };
        let files = FsGameFiles::new(config, &game);
        assert!(matches!(
            files.prepare().await,
            Err(GameFilesError::SourceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_destination_cannot_escape() {
        let dir = TempDir::new().unwrap();
        let game = install(&dir);
        let source = dir.path().join("a.ini");
        std::fs::write(&source, b"x").unwrap();
        let config = GameFilesConfig {
            overlays: vec![OverlayFile {
                source,
                destination: PathBuf::from("../outside.ini"),
            }],
        };
        let files = FsGameFiles::new(config, &game);
        assert!(matches!(
            files.prepare().await,
            Err(GameFilesError::InvalidDestination { .. })
        ));
    }
}
