//! On-disk tile file layout.
//!
//! Tiles are plain files named `<z>_<x>_<y>.png` under one base directory.
//! Deletion is best-effort: a tile list can reference files that were
//! already removed, and an undeletable file never blocks record cleanup.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Owns the directory downloaded tiles are written to.
#[derive(Clone)]
pub struct TileStore {
    base: PathBuf,
}

impl TileStore {
    /// Open the store, creating the base directory if needed.
    pub async fn open(base: impl Into<PathBuf>) -> Result<Self> {
        let base = base.into();
        tokio::fs::create_dir_all(&base)
            .await
            .with_context(|| format!("failed to create tile directory {}", base.display()))?;
        Ok(TileStore { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Filesystem path for one tile.
    pub fn tile_path(&self, z: u8, x: u32, y: u32) -> PathBuf {
        self.base.join(format!("{z}_{x}_{y}.png"))
    }

    /// Delete a set of tile files. Already-missing files are fine; other
    /// failures are logged and the remaining files are still attempted.
    /// Returns how many files were actually removed.
    pub async fn remove_files(&self, paths: &[PathBuf]) -> usize {
        let mut removed = 0;
        for path in paths {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "deleted tile file");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "could not delete tile file: {}", e)
                }
            }
        }
        removed
    }
}
