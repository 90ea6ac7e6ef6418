use crate::error::EngineError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

fn default_tile_batch_size() -> usize {
    10
}

fn default_region_timeout_secs() -> u64 {
    600
}

/// Global configuration loaded from `~/.config/roam/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cache quota in megabytes across available and outdated regions.
    pub max_cache_mb: f64,
    /// Tile server URL template with `{z}`, `{x}`, `{y}` placeholders.
    pub tile_url_template: String,
    /// Coarsest zoom level downloaded per region.
    pub min_zoom: u8,
    /// Finest zoom level downloaded per region.
    pub max_zoom: u8,
    /// Tiles fetched concurrently within one region; the next batch starts
    /// only after the current one fully settles.
    #[serde(default = "default_tile_batch_size")]
    pub tile_batch_size: usize,
    /// Wall-clock limit a waiter applies to one region download.
    #[serde(default = "default_region_timeout_secs")]
    pub region_timeout_secs: u64,
    /// Tile directory override (None = XDG state dir).
    #[serde(default)]
    pub tile_dir: Option<PathBuf>,
    /// Database path override (None = XDG state dir).
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_cache_mb: 2000.0,
            tile_url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            min_zoom: 10,
            max_zoom: 14,
            tile_batch_size: default_tile_batch_size(),
            region_timeout_secs: default_region_timeout_secs(),
            tile_dir: None,
            db_path: None,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tile_url_template.contains(placeholder) {
                return Err(EngineError::InvalidConfig(format!(
                    "tile_url_template is missing the {placeholder} placeholder"
                )));
            }
        }
        let sample = self
            .tile_url_template
            .replace("{z}", "0")
            .replace("{x}", "0")
            .replace("{y}", "0");
        if let Err(e) = url::Url::parse(&sample) {
            return Err(EngineError::InvalidConfig(format!(
                "tile_url_template does not resolve to a valid URL: {e}"
            )));
        }
        if self.min_zoom > self.max_zoom {
            return Err(EngineError::InvalidConfig(format!(
                "min_zoom {} is finer than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.max_cache_mb <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "max_cache_mb must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("roam")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}
