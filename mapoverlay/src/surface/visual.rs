//! Visuals that exist only on the surface, with no registry entity behind them.

use crate::geo::{Argb, LatLng};
use crate::icon::Bitmap;

/// A rendered group of clustered markers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterVisual {
    /// Stable key derived from the lowest member id
    pub key: String,
    pub position: LatLng,
    /// Member ids in ascending order
    pub member_ids: Vec<String>,
    pub icon: Option<Bitmap>,
}

impl ClusterVisual {
    pub fn count(&self) -> usize {
        self.member_ids.len()
    }
}

/// The expanding circle drawn by a pulse animation.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleVisual {
    /// Id of the marker the circle belongs to
    pub id: String,
    pub center: LatLng,
    pub radius_meters: f64,
    pub fill: Argb,
}
