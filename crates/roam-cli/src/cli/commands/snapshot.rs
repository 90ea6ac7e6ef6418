//! `roam snapshot` – inspect and clear the map snapshot cache.

use anyhow::Result;
use chrono::{Local, TimeZone};
use roam_core::engine::MapEngine;
use roam_core::snapshot::MapCacheInfo;

use crate::cli::SnapshotAction;

fn format_ms(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_info(info: &MapCacheInfo) {
    println!(
        "{}: {} bytes, {} node(s), {} road segment(s), saved {}",
        info.name,
        info.size,
        info.node_count,
        info.road_segment_count,
        format_ms(info.timestamp)
    );
}

pub async fn run_snapshot(engine: &MapEngine, action: SnapshotAction) -> Result<()> {
    let cache = engine.snapshot_cache();
    match action {
        SnapshotAction::Info => match cache.cache_info().await {
            Some(info) => print_info(&info),
            None => println!("No snapshot cached."),
        },
        SnapshotAction::List => {
            let catalog = cache.cache_list().await;
            if catalog.is_empty() {
                println!("Snapshot catalog is empty.");
            }
            for info in catalog.values() {
                print_info(info);
            }
        }
        SnapshotAction::Clear { name } => {
            cache.clear(name.as_deref()).await;
            match name {
                Some(name) => println!("Cleared snapshot entry {name:?}."),
                None => println!("Cleared the snapshot cache."),
            }
        }
    }
    Ok(())
}
