//! `roam covered` – point coverage query.

use anyhow::Result;
use roam_core::engine::MapEngine;
use roam_core::geo::GeoPoint;
use roam_core::registry::RegionStatus;

pub async fn run_covered(engine: &MapEngine, lat: f64, lon: f64) -> Result<()> {
    let point = GeoPoint::new(lat, lon);
    let covering: Vec<String> = engine
        .regions()
        .await
        .into_iter()
        .filter(|r| r.status == RegionStatus::Available && r.bounds.contains_point(&point))
        .map(|r| r.id)
        .collect();
    if covering.is_empty() {
        println!("({lat}, {lon}) is not covered by any available region.");
    } else {
        println!("({lat}, {lon}) is covered by: {}", covering.join(", "));
    }
    Ok(())
}
