//! Snapshot cache for the parsed map graph.
//!
//! Entirely separate from region downloads: this stores whatever graph the
//! host application last parsed, plus a named catalog of past snapshots, so
//! the app can restart without re-parsing. Storage failures are logged and
//! reads of missing or corrupt data come back as `None`.

pub mod types;

use crate::store::{now_ms, KvStore, MAP_CACHE_LIST_KEY, MAP_DATA_KEY, MAP_INFO_KEY};
use std::collections::BTreeMap;
use types::SnapshotBlob;

pub use types::{MapCacheInfo, MapNode, RoadSegment};

/// Facade over the three snapshot keys.
#[derive(Clone)]
pub struct SnapshotCache {
    kv: KvStore,
}

impl SnapshotCache {
    pub fn new(kv: KvStore) -> Self {
        SnapshotCache { kv }
    }

    /// Save the graph as the current snapshot and record it in the catalog
    /// under `name`. Returns the catalog record, or `None` when the blob
    /// never reached the store (already logged).
    pub async fn save(
        &self,
        nodes: Vec<MapNode>,
        road_segments: Vec<RoadSegment>,
        name: &str,
    ) -> Option<MapCacheInfo> {
        let blob = SnapshotBlob {
            nodes,
            road_segments,
        };
        let json = match serde_json::to_string(&blob) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("snapshot serialize failed: {e}");
                return None;
            }
        };
        let info = MapCacheInfo {
            timestamp: now_ms(),
            size: json.len() as u64,
            name: name.to_string(),
            node_count: blob.nodes.len(),
            road_segment_count: blob.road_segments.len(),
        };

        if let Err(e) = self.kv.put_raw(MAP_DATA_KEY, &json).await {
            tracing::warn!("snapshot blob write failed: {e:#}");
            return None;
        }
        self.kv.put(MAP_INFO_KEY, &info).await;

        let mut catalog = self.cache_list().await;
        catalog.insert(name.to_string(), info.clone());
        self.kv.put(MAP_CACHE_LIST_KEY, &catalog).await;

        tracing::info!(
            name,
            nodes = info.node_count,
            segments = info.road_segment_count,
            bytes = info.size,
            "saved map snapshot"
        );
        Some(info)
    }

    /// Load the current snapshot. Absent or corrupt data is `None`.
    pub async fn load(&self) -> Option<(Vec<MapNode>, Vec<RoadSegment>)> {
        let blob: SnapshotBlob = self.kv.get(MAP_DATA_KEY).await?;
        Some((blob.nodes, blob.road_segments))
    }

    /// Catalog record of the current snapshot, if any.
    pub async fn cache_info(&self) -> Option<MapCacheInfo> {
        self.kv.get(MAP_INFO_KEY).await
    }

    /// Full catalog of named snapshots. Absent or corrupt comes back empty.
    pub async fn cache_list(&self) -> BTreeMap<String, MapCacheInfo> {
        self.kv.get(MAP_CACHE_LIST_KEY).await.unwrap_or_default()
    }

    /// Drop one named snapshot from the catalog, or everything when `name`
    /// is `None`. Removing the name of the current snapshot also drops the
    /// blob and its info record.
    pub async fn clear(&self, name: Option<&str>) {
        match name {
            None => {
                for key in [MAP_DATA_KEY, MAP_INFO_KEY, MAP_CACHE_LIST_KEY] {
                    if let Err(e) = self.kv.remove(key).await {
                        tracing::warn!(key, "snapshot clear failed: {e:#}");
                    }
                }
            }
            Some(name) => {
                let mut catalog = self.cache_list().await;
                if catalog.remove(name).is_some() {
                    self.kv.put(MAP_CACHE_LIST_KEY, &catalog).await;
                }
                let current = self.cache_info().await;
                if current.map_or(false, |info| info.name == name) {
                    for key in [MAP_DATA_KEY, MAP_INFO_KEY] {
                        if let Err(e) = self.kv.remove(key).await {
                            tracing::warn!(key, "snapshot clear failed: {e:#}");
                        }
                    }
                }
            }
        }
    }
}
