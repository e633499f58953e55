//! Map surface capability trait.

use std::fmt;
use thiserror::Error;

use super::visual::{CircleVisual, ClusterVisual};
use crate::registry::{HeatmapState, MarkerState, PolylineEntity, TileOverlayEntity};

/// A rendering capability a surface may lack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Marker,
    MarkerOffset,
    Polyline,
    TileOverlay,
    Heatmap,
    Cluster,
    Circle,
    Snapshot,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Marker => "markers",
            Capability::MarkerOffset => "marker offsets",
            Capability::Polyline => "polylines",
            Capability::TileOverlay => "tile overlays",
            Capability::Heatmap => "heatmaps",
            Capability::Cluster => "clusters",
            Capability::Circle => "circles",
            Capability::Snapshot => "snapshots",
        };
        f.write_str(name)
    }
}

/// Errors reported by a map surface.
///
/// The engine logs these and carries on; nothing here reaches the host.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// Surface cannot render this kind of visual
    #[error("Map surface does not support {0}")]
    Unsupported(Capability),

    /// No visual with this id is attached
    #[error("No {kind} attached with id '{id}'")]
    UnknownVisual { kind: &'static str, id: String },

    /// A visual with this id is already attached
    #[error("{kind} '{id}' is already attached")]
    AlreadyAttached { kind: &'static str, id: String },

    /// Adapter-specific failure
    #[error("Map surface error: {0}")]
    Adapter(String),
}

/// The set of rendering operations the engine drives.
///
/// Adapters implement every method. Optional capabilities default to
/// [`SurfaceError::Unsupported`], so a surface without heatmaps or
/// snapshots only overrides what it can do.
pub trait MapSurface: Send {
    fn attach_marker(&mut self, marker: &MarkerState) -> Result<(), SurfaceError>;

    fn update_marker(&mut self, marker: &MarkerState) -> Result<(), SurfaceError>;

    fn detach_marker(&mut self, id: &str) -> Result<(), SurfaceError>;

    /// Shifts a rendered marker vertically by `offset_px` screen pixels.
    fn set_marker_offset(&mut self, _id: &str, _offset_px: f32) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::MarkerOffset))
    }

    fn attach_polyline(&mut self, polyline: &PolylineEntity) -> Result<(), SurfaceError>;

    fn detach_polyline(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn attach_tile_overlay(&mut self, overlay: &TileOverlayEntity) -> Result<(), SurfaceError>;

    fn detach_tile_overlay(&mut self, id: &str) -> Result<(), SurfaceError>;

    fn attach_heatmap(&mut self, _heatmap: &HeatmapState) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Heatmap))
    }

    fn detach_heatmap(&mut self) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Heatmap))
    }

    fn attach_cluster(&mut self, _cluster: &ClusterVisual) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Cluster))
    }

    fn detach_cluster(&mut self, _key: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Cluster))
    }

    fn attach_circle(&mut self, _circle: &CircleVisual) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Circle))
    }

    fn update_circle(&mut self, _circle: &CircleVisual) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Circle))
    }

    fn detach_circle(&mut self, _id: &str) -> Result<(), SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Circle))
    }

    /// Encoded image of the current map, typically PNG.
    fn snapshot(&mut self) -> Result<Vec<u8>, SurfaceError> {
        Err(SurfaceError::Unsupported(Capability::Snapshot))
    }
}
