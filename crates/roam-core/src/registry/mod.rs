//! In-memory region registry with durable JSON backing.
//!
//! The map held here is the authoritative state; every mutation is followed
//! by a write-through `persist` and a failed write only logs (the engine
//! keeps serving from memory).

pub mod types;

use crate::geo::{GeoBounds, GeoPoint};
use crate::store::{KvStore, REGIONS_KEY};
use std::collections::HashMap;

pub use types::{OfflineRegion, RegionRequest, RegionStatus};

/// All known regions, keyed by region id.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: HashMap<String, OfflineRegion>,
}

impl RegionRegistry {
    /// Load the persisted registry. Absent or corrupt data yields an empty
    /// registry.
    pub async fn load(kv: &KvStore) -> Self {
        let records: Vec<OfflineRegion> = kv.get(REGIONS_KEY).await.unwrap_or_default();
        let regions = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        RegionRegistry { regions }
    }

    /// Write the full record set back, sorted by id for a stable on-disk
    /// shape.
    pub async fn persist(&self, kv: &KvStore) {
        let mut records: Vec<&OfflineRegion> = self.regions.values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        kv.put(REGIONS_KEY, &records).await;
    }

    pub fn get(&self, id: &str) -> Option<&OfflineRegion> {
        self.regions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut OfflineRegion> {
        self.regions.get_mut(id)
    }

    pub fn insert(&mut self, region: OfflineRegion) {
        self.regions.insert(region.id.clone(), region);
    }

    pub fn remove(&mut self, id: &str) -> Option<OfflineRegion> {
        self.regions.remove(id)
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.regions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of every record, sorted by id.
    pub fn list(&self) -> Vec<OfflineRegion> {
        let mut records: Vec<OfflineRegion> = self.regions.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub fn iter(&self) -> impl Iterator<Item = &OfflineRegion> {
        self.regions.values()
    }

    /// True when some fully downloaded region contains the point. Regions
    /// still downloading, outdated, or errored do not count as coverage.
    pub fn point_covered(&self, point: &GeoPoint) -> bool {
        self.regions
            .values()
            .any(|r| r.status == RegionStatus::Available && r.bounds.contains_point(point))
    }

    /// True when some fully downloaded region contains the whole box.
    pub fn bounds_covered(&self, bounds: &GeoBounds) -> bool {
        self.regions
            .values()
            .any(|r| r.status == RegionStatus::Available && r.bounds.contains(bounds))
    }
}
