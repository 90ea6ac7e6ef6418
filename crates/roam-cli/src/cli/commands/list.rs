//! `roam list` – show all cached regions.

use anyhow::Result;
use chrono::{Local, TimeZone};
use roam_core::engine::MapEngine;

pub async fn run_list(engine: &MapEngine) -> Result<()> {
    let regions = engine.regions().await;
    if regions.is_empty() {
        println!("No regions cached.");
        return Ok(());
    }
    println!(
        "{:<14} {:<12} {:<6} {:<9} {:<17} {}",
        "ID", "STATUS", "PROG", "SIZE(MB)", "UPDATED", "NAME"
    );
    for r in regions {
        let prog = r
            .download_progress
            .map(|p| format!("{p}%"))
            .unwrap_or_else(|| "-".to_string());
        let updated = r
            .last_updated
            .and_then(|ms| Local.timestamp_millis_opt(ms).single())
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<14} {:<12} {:<6} {:<9.1} {:<17} {}",
            r.id,
            r.status.as_str(),
            prog,
            r.size_mb,
            updated,
            r.name
        );
    }
    Ok(())
}
