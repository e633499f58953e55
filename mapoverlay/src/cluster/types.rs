//! Cluster configuration and item types.

use crate::icon::{IconKey, DEFAULT_ICON_SIZE_POINTS};
use crate::registry::MarkerState;
use crate::surface::ClusterVisual;

/// Default grouping distance in screen pixels.
pub const DEFAULT_CLUSTER_DISTANCE_PX: f64 = 100.0;

/// Camera zoom assumed until the host moves the camera.
pub const DEFAULT_CLUSTER_ZOOM: f64 = 14.0;

/// Clustering parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Items whose projected distance to a seed is at most this join its group
    pub distance_px: f64,
    /// Initial camera zoom
    pub zoom: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            distance_px: DEFAULT_CLUSTER_DISTANCE_PX,
            zoom: DEFAULT_CLUSTER_ZOOM,
        }
    }
}

impl ClusterConfig {
    pub fn with_distance_px(mut self, distance_px: f64) -> Self {
        self.distance_px = distance_px;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }
}

/// A marker living in cluster space.
///
/// Carries the complete marker state so switching clustering off restores
/// the marker exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterItem {
    pub state: MarkerState,
    /// Icon size in points used when this item represents a group
    pub icon_display_size: u32,
}

impl ClusterItem {
    pub fn new(state: MarkerState) -> Self {
        let icon_display_size = state
            .entity
            .icon
            .as_ref()
            .map(|icon| icon.size_points)
            .unwrap_or(DEFAULT_ICON_SIZE_POINTS);
        Self {
            state,
            icon_display_size,
        }
    }

    pub fn id(&self) -> &str {
        self.state.id()
    }
}

/// A group currently drawn as a cluster visual.
#[derive(Debug, Clone)]
pub(super) struct RenderedCluster {
    pub visual: ClusterVisual,
    /// Icon the visual is waiting for, if resolution was deferred
    pub pending_icon: Option<IconKey>,
}

/// Cluster icon size for a group of `count` items.
///
/// Larger groups get proportionally larger icons: under 10 members use the
/// base size, under 100 use 1.25× and anything bigger 1.5×.
pub fn cluster_icon_size(base_points: u32, count: usize) -> u32 {
    let factor = match count {
        0..=9 => 1.0,
        10..=99 => 1.25,
        _ => 1.5,
    };
    (base_points as f64 * factor).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_icon_size_buckets() {
        assert_eq!(cluster_icon_size(48, 3), 48);
        assert_eq!(cluster_icon_size(48, 10), 60);
        assert_eq!(cluster_icon_size(48, 150), 72);
    }
}
