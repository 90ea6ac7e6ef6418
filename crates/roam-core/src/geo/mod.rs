//! Web-Mercator tile mathematics.
//!
//! Pure conversions between geographic coordinates and slippy-map tile
//! indices, plus the expansion of a geographic bounding box into the tile
//! set a region download fetches. Inputs are clamped to the Mercator
//! domain so every function is total.

pub mod types;

pub use types::{GeoBounds, GeoPoint, MapTile, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

use std::f64::consts::PI;

/// Ceiling on the tile count of a whole region download. Zoom levels that
/// would individually exceed their share of this budget are dropped,
/// coarsest first; the two finest levels are always kept.
pub const MAX_TILES_PER_REGION: usize = 1000;

/// Longitude to tile column at `zoom`. The east edge (+180°) folds into
/// the last column.
#[inline]
pub fn lon2tile(lon: f64, zoom: u8) -> u32 {
    let lon = lon.clamp(MIN_LON, MAX_LON);
    let n = 2f64.powi(zoom as i32);
    let x = ((lon + 180.0) / 360.0 * n).floor();
    x.min(n - 1.0).max(0.0) as u32
}

/// Latitude to tile row at `zoom` (row 0 at the north edge). The south
/// edge of the Mercator square folds into the last row.
#[inline]
pub fn lat2tile(lat: f64, zoom: u8) -> u32 {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let n = 2f64.powi(zoom as i32);
    let lat_rad = lat * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor();
    y.min(n - 1.0).max(0.0) as u32
}

/// Longitude of the west edge of tile column `x` at `zoom`.
#[inline]
pub fn tile2lon(x: u32, zoom: u8) -> f64 {
    let n = 2f64.powi(zoom as i32);
    x as f64 / n * 360.0 - 180.0
}

/// Latitude of the north edge of tile row `y` at `zoom`.
#[inline]
pub fn tile2lat(y: u32, zoom: u8) -> f64 {
    let n = 2f64.powi(zoom as i32);
    let inner = PI * (1.0 - 2.0 * y as f64 / n);
    inner.sinh().atan() * 180.0 / PI
}

/// Resolves a `{z}`/`{x}`/`{y}` URL template for one tile.
pub fn tile_url(template: &str, z: u8, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

/// Expands `bounds` into the tiles to download for zoom levels
/// `min_zoom..=max_zoom`, with resolved URLs and unset paths.
///
/// Each zoom level gets an equal share of [`MAX_TILES_PER_REGION`]; a level
/// whose rectangle exceeds that share is skipped entirely, except the two
/// finest levels which are never skipped. Large regions therefore lose
/// coverage at coarse zooms rather than growing without bound.
pub fn tiles_for_region(
    bounds: &GeoBounds,
    min_zoom: u8,
    max_zoom: u8,
    url_template: &str,
) -> Vec<MapTile> {
    let mut tiles = Vec::new();
    if min_zoom > max_zoom {
        return tiles;
    }
    let levels = (max_zoom - min_zoom + 1) as usize;
    let per_zoom_cap = MAX_TILES_PER_REGION / levels;

    for zoom in min_zoom..=max_zoom {
        let x_min = lon2tile(bounds.southwest.longitude, zoom);
        let x_max = lon2tile(bounds.northeast.longitude, zoom);
        let y_min = lat2tile(bounds.northeast.latitude, zoom);
        let y_max = lat2tile(bounds.southwest.latitude, zoom);
        if x_max < x_min || y_max < y_min {
            continue;
        }

        let count = (x_max - x_min + 1) as usize * (y_max - y_min + 1) as usize;
        let finest_two = zoom >= max_zoom.saturating_sub(1);
        if count > per_zoom_cap && !finest_two {
            tracing::debug!(zoom, count, per_zoom_cap, "zoom level over tile budget, skipped");
            continue;
        }

        for x in x_min..=x_max {
            for y in y_min..=y_max {
                tiles.push(MapTile {
                    z: zoom,
                    x,
                    y,
                    url: tile_url(url_template, zoom, x, y),
                    path: None,
                });
            }
        }
    }
    tiles
}
