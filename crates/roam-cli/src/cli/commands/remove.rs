//! `roam remove` – delete cached regions and their tile files.

use anyhow::{bail, Result};
use roam_core::engine::MapEngine;

pub async fn run_remove(engine: &MapEngine, id: Option<&str>, all: bool) -> Result<()> {
    if all {
        let removed = engine.delete_all_regions().await;
        println!("Removed {removed} region(s).");
        return Ok(());
    }
    let Some(id) = id else {
        bail!("pass a region id or --all");
    };
    if engine.delete_region(id).await {
        println!("Removed region {id}.");
        Ok(())
    } else {
        bail!("no region with id {id:?}");
    }
}
