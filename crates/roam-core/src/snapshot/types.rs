//! Parsed map-graph shapes and snapshot catalog records.
//!
//! These mirror what the host application's map parser produces. The JSON
//! spellings are a persistence contract shared with that application.

use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// One graph node of the parsed map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: i64,
    pub position: GeoPoint,
}

/// One drivable edge between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadSegment {
    pub id: i64,
    pub start_node: i64,
    pub end_node: i64,
    #[serde(rename = "length")]
    pub length_m: f64,
}

/// Catalog record describing one saved snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCacheInfo {
    /// Unix milliseconds at save time.
    pub timestamp: i64,
    /// Serialized blob size in bytes.
    pub size: u64,
    pub name: String,
    pub node_count: usize,
    pub road_segment_count: usize,
}

/// The serialized graph blob stored under the map-data key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SnapshotBlob {
    pub nodes: Vec<MapNode>,
    pub road_segments: Vec<RoadSegment>,
}
