//! `roam fetch` – download a region for offline use.

use anyhow::{Context, Result};
use roam_core::engine::MapEngine;
use roam_core::geo::{GeoBounds, GeoPoint};
use roam_core::registry::RegionRequest;

/// Parse a "lat,lon" pair into a point.
pub fn parse_point(s: &str) -> Result<GeoPoint> {
    let (lat, lon) = s
        .split_once(',')
        .with_context(|| format!("expected \"lat,lon\", got {s:?}"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .with_context(|| format!("bad latitude in {s:?}"))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .with_context(|| format!("bad longitude in {s:?}"))?;
    Ok(GeoPoint::new(latitude, longitude))
}

pub async fn run_fetch(
    engine: &MapEngine,
    id: &str,
    name: &str,
    ne: &str,
    sw: &str,
    size_mb: f64,
) -> Result<()> {
    let request = RegionRequest {
        id: id.to_string(),
        name: name.to_string(),
        bounds: GeoBounds::new(parse_point(ne)?, parse_point(sw)?),
        size_mb,
    };

    let wanted = id.to_string();
    let listener = engine.add_progress_listener(move |region_id, pct| {
        if region_id == wanted {
            println!("\r  {region_id}: {pct}%  ");
        }
    });

    let handle = engine.request_download(request).await?;
    tracing::info!(id, "download requested");
    let outcome = handle.wait().await;
    engine.remove_progress_listener(listener);

    let record = outcome?;
    let tiles = engine.region_tiles(&record.id).await.len();
    println!(
        "Region {} ({}) ready: {} tile(s) cached, {:.1} MB",
        record.id, record.name, tiles, record.size_mb
    );
    Ok(())
}
