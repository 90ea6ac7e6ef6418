//! Types used by the region registry.
//!
//! The serialized shapes here are a persistence contract: the JSON written
//! under `offline_map_regions` uses camelCase keys (with `sizeInMB` spelled
//! exactly so) and lowercase status strings, and timestamps are unix
//! milliseconds. External tooling reads these records as-is.

use crate::geo::GeoBounds;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a cached region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    None,
    Downloading,
    Available,
    Outdated,
    Error,
}

impl RegionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionStatus::None => "none",
            RegionStatus::Downloading => "downloading",
            RegionStatus::Available => "available",
            RegionStatus::Outdated => "outdated",
            RegionStatus::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "none" => RegionStatus::None,
            "downloading" => RegionStatus::Downloading,
            "available" => RegionStatus::Available,
            "outdated" => RegionStatus::Outdated,
            "error" => RegionStatus::Error,
            _ => RegionStatus::Error,
        }
    }
}

/// One persisted region record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineRegion {
    pub id: String,
    pub name: String,
    pub bounds: GeoBounds,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Estimated size in megabytes, supplied by the caller at request time.
    /// Capacity accounting uses this estimate, never measured bytes.
    #[serde(rename = "sizeInMB")]
    pub size_mb: f64,
    pub status: RegionStatus,
    /// 0..=100 while downloading; cleared on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_progress: Option<u8>,
    /// Unix milliseconds of the last successful download.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<i64>,
}

/// Caller-supplied parameters for a download request.
#[derive(Debug, Clone)]
pub struct RegionRequest {
    pub id: String,
    pub name: String,
    pub bounds: GeoBounds,
    pub size_mb: f64,
}
