//! Overlay entities and the registry that owns them.

mod pending;
mod store;
mod types;

pub use pending::PendingMarker;
pub use store::{FlushReport, OverlayRegistry};
pub use types::{
    HeatmapState, MarkerEntity, MarkerPatch, MarkerState, PolylineEntity, TileOverlayEntity,
    DEFAULT_HEATMAP_OPACITY, DEFAULT_HEATMAP_RADIUS, DEFAULT_POLYLINE_WIDTH, DEFAULT_TILE_SIZE,
};
