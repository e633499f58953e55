//! Geographic primitives and the Web Mercator pixel projection.
//!
//! Positions are passed through to the map surface untouched. The only
//! projection performed here is the world-pixel conversion the cluster
//! engine uses to measure screen distance between markers.

mod types;

pub use types::{normalize_rotation, Anchor, Argb, LatLng, WeightedLatLng, MAX_LAT, MIN_LAT};

use std::f64::consts::PI;

/// Size of one Web Mercator tile in pixels at zoom 0.
pub const WORLD_TILE_SIZE: f64 = 256.0;

/// A point in world pixel space at a given zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub fn distance_to(&self, other: &WorldPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Projects a geographic position into world pixels at `zoom`.
///
/// Latitude is clamped to the Web Mercator range so polar input never
/// produces infinities.
#[inline]
pub fn world_point(position: LatLng, zoom: f64) -> WorldPoint {
    let scale = WORLD_TILE_SIZE * 2.0_f64.powf(zoom);

    let lat = position.lat.clamp(MIN_LAT, MAX_LAT);
    let lat_rad = lat * PI / 180.0;

    let x = (position.lng + 180.0) / 360.0 * scale;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale;

    WorldPoint { x, y }
}

/// Arithmetic mean of a set of positions.
///
/// Returns `None` for an empty slice.
pub fn centroid(positions: &[LatLng]) -> Option<LatLng> {
    if positions.is_empty() {
        return None;
    }
    let n = positions.len() as f64;
    let (lat, lng) = positions
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    Some(LatLng::new(lat / n, lng / n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_point_origin_is_center() {
        let p = world_point(LatLng::new(0.0, 0.0), 0.0);
        assert!((p.x - 128.0).abs() < 1e-9);
        assert!((p.y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_world_point_scales_with_zoom() {
        let z0 = world_point(LatLng::new(10.0, 20.0), 0.0);
        let z1 = world_point(LatLng::new(10.0, 20.0), 1.0);
        assert!((z1.x - z0.x * 2.0).abs() < 1e-9);
        assert!((z1.y - z0.y * 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_world_point_clamps_poles() {
        let p = world_point(LatLng::new(90.0, 0.0), 3.0);
        assert!(p.y.is_finite());
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn test_distance() {
        let a = WorldPoint { x: 0.0, y: 0.0 };
        let b = WorldPoint { x: 3.0, y: 4.0 };
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn test_centroid() {
        let c = centroid(&[LatLng::new(0.0, 0.0), LatLng::new(10.0, 20.0)]).unwrap();
        assert_eq!(c, LatLng::new(5.0, 10.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_anchor_clamps() {
        let a = Anchor::new(-1.0, 2.5);
        assert_eq!(a.u(), 0.0);
        assert_eq!(a.v(), 1.0);
        assert_eq!(Anchor::default(), Anchor::new(0.5, 1.0));
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(normalize_rotation(370.0), 10.0);
        assert_eq!(normalize_rotation(-90.0), 270.0);
        assert_eq!(normalize_rotation(360.0), 0.0);
        assert_eq!(normalize_rotation(f32::NAN), 0.0);
    }

    #[test]
    fn test_argb_alpha() {
        let c = Argb(0x803F51B5);
        assert_eq!(c.alpha(), 0x80);
        assert_eq!(c.with_alpha(0x10), Argb(0x103F51B5));
        assert_eq!(c.to_string(), "#803F51B5");
    }
}
