//! Geographic and tile wire types.
//!
//! JSON field names match the persisted shapes consumed by the navigation
//! client, so these types round-trip byte-compatible records.

use serde::{Deserialize, Serialize};

/// Web-Mercator valid latitude range.
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range.
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Rectangular geographic area spanned by its northeast and southwest
/// corners. Valid bounds satisfy `northeast.latitude >= southwest.latitude`
/// and `northeast.longitude >= southwest.longitude`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub northeast: GeoPoint,
    pub southwest: GeoPoint,
}

impl GeoBounds {
    pub fn new(northeast: GeoPoint, southwest: GeoPoint) -> Self {
        Self { northeast, southwest }
    }

    /// True when the corners are ordered (northeast at or above/right of
    /// southwest on both axes).
    pub fn is_valid(&self) -> bool {
        self.northeast.latitude >= self.southwest.latitude
            && self.northeast.longitude >= self.southwest.longitude
    }

    /// Closed-interval point containment.
    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.southwest.latitude
            && point.latitude <= self.northeast.latitude
            && point.longitude >= self.southwest.longitude
            && point.longitude <= self.northeast.longitude
    }

    /// True iff `other` lies fully inside this box on both axes
    /// (closed intervals, so shared edges still count as contained).
    pub fn contains(&self, other: &GeoBounds) -> bool {
        self.contains_point(&other.northeast) && self.contains_point(&other.southwest)
    }
}

/// One downloadable tile: Web-Mercator grid address, resolved source URL,
/// and (after a successful fetch) the on-disk path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapTile {
    pub z: u8,
    pub x: u32,
    pub y: u32,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(ne: (f64, f64), sw: (f64, f64)) -> GeoBounds {
        GeoBounds::new(GeoPoint::new(ne.0, ne.1), GeoPoint::new(sw.0, sw.1))
    }

    #[test]
    fn containment_requires_both_corners_inside() {
        let outer = bounds((38.0, 128.0), (37.0, 126.0));
        let inner = bounds((37.6, 127.0), (37.5, 126.9));
        let overlapping = bounds((38.5, 127.0), (37.5, 126.9));

        assert!(outer.contains(&inner));
        assert!(!outer.contains(&overlapping), "partial overlap is not containment");
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn containment_is_closed_interval() {
        let outer = bounds((38.0, 128.0), (37.0, 126.0));
        // Shares the full northeast edge with the container.
        let edge = bounds((38.0, 128.0), (37.5, 127.0));
        assert!(outer.contains(&edge));
        assert!(outer.contains(&outer), "a box contains itself");
    }

    #[test]
    fn point_containment_on_the_border() {
        let b = bounds((37.60, 127.00), (37.50, 126.90));
        assert!(b.contains_point(&GeoPoint::new(37.60, 127.00)));
        assert!(b.contains_point(&GeoPoint::new(37.55, 126.95)));
        assert!(!b.contains_point(&GeoPoint::new(37.61, 126.95)));
    }

    #[test]
    fn inverted_bounds_are_invalid() {
        assert!(!bounds((37.0, 126.0), (38.0, 128.0)).is_valid());
        assert!(bounds((38.0, 128.0), (37.0, 126.0)).is_valid());
    }

    #[test]
    fn map_tile_json_shape() {
        let tile = MapTile {
            z: 12,
            x: 3491,
            y: 1586,
            url: "https://tile.example.com/12/3491/1586.png".into(),
            path: Some("/tmp/tiles/12_3491_1586.png".into()),
        };
        let json = serde_json::to_value(&tile).unwrap();
        assert_eq!(json["z"], 12);
        assert_eq!(json["x"], 3491);
        assert_eq!(json["y"], 1586);
        assert_eq!(json["path"], "/tmp/tiles/12_3491_1586.png");

        let unfetched = MapTile { path: None, ..tile };
        let json = serde_json::to_string(&unfetched).unwrap();
        assert!(!json.contains("path"), "unresolved path is omitted: {json}");
    }
}
