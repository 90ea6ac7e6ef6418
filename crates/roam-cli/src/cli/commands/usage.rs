//! `roam usage` – cache size against the quota.

use anyhow::Result;
use roam_core::engine::MapEngine;

pub async fn run_usage(engine: &MapEngine) -> Result<()> {
    let used = engine.total_cache_mb().await;
    let limit = engine.max_cache_mb();
    let pct = if limit > 0.0 { used / limit * 100.0 } else { 0.0 };
    println!("{used:.1} / {limit:.1} MB ({pct:.1}%)");
    Ok(())
}
