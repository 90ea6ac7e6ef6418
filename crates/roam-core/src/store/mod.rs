//! Durable storage collaborators: the SQLite key-value store and the
//! on-disk tile directory.

pub mod kv;
pub mod tiles;

pub use kv::{
    now_ms, region_tiles_key, KvStore, AUTO_UPDATE_KEY, MAP_CACHE_LIST_KEY, MAP_DATA_KEY,
    MAP_INFO_KEY, REGIONS_KEY,
};
pub use tiles::TileStore;
