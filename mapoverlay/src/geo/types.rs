//! Geographic value types shared by every overlay entity.

use serde::Deserialize;
use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Marker anchor in normalized icon space.
///
/// `(0, 0)` is the top-left corner of the icon and `(1, 1)` the bottom-right.
/// Both components are clamped to `[0, 1]` on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    u: f32,
    v: f32,
}

impl Anchor {
    /// Bottom-center, where a pin's tip usually sits.
    pub const DEFAULT: Anchor = Anchor { u: 0.5, v: 1.0 };

    pub fn new(u: f32, v: f32) -> Self {
        Self {
            u: clamp_unit(u),
            v: clamp_unit(v),
        }
    }

    pub fn u(&self) -> f32 {
        self.u
    }

    pub fn v(&self) -> f32 {
        self.v
    }
}

impl Default for Anchor {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// A color packed as `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Argb(pub u32);

impl Argb {
    pub const BLACK: Argb = Argb(0xFF00_0000);

    pub fn alpha(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Returns the same color with its alpha channel replaced.
    pub fn with_alpha(self, alpha: u8) -> Argb {
        Argb((self.0 & 0x00FF_FFFF) | ((alpha as u32) << 24))
    }
}

impl fmt::Display for Argb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

/// A heatmap sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedLatLng {
    pub position: LatLng,
    pub intensity: f64,
}

/// Wraps a rotation in degrees into `[0, 360)`.
pub fn normalize_rotation(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
