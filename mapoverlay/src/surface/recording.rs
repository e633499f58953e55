//! Headless surface that records what would be on screen.
//!
//! Keeps the currently attached visuals plus an operation log. Used by the
//! CLI replay tool and throughout the test suite.

use image::{Rgba, RgbaImage};
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;

use super::r#trait::{Capability, MapSurface, SurfaceError};
use super::visual::{CircleVisual, ClusterVisual};
use crate::geo::{world_point, LatLng};
use crate::registry::{HeatmapState, MarkerState, PolylineEntity, TileOverlayEntity};

/// One call made against the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AttachMarker(String),
    UpdateMarker(String),
    DetachMarker(String),
    MarkerOffset(String, f32),
    AttachPolyline(String),
    DetachPolyline(String),
    AttachTileOverlay(String),
    DetachTileOverlay(String),
    AttachHeatmap,
    DetachHeatmap,
    AttachCluster(String),
    DetachCluster(String),
    AttachCircle(String),
    UpdateCircle(String),
    DetachCircle(String),
    Snapshot,
}

/// In-memory [`MapSurface`].
#[derive(Debug)]
pub struct RecordingSurface {
    markers: BTreeMap<String, MarkerState>,
    offsets: HashMap<String, f32>,
    polylines: BTreeMap<String, PolylineEntity>,
    tile_overlays: BTreeMap<String, TileOverlayEntity>,
    heatmap: Option<HeatmapState>,
    clusters: BTreeMap<String, ClusterVisual>,
    circles: BTreeMap<String, CircleVisual>,
    ops: Vec<SurfaceOp>,
    duplicate_attaches: usize,
    viewport: (u32, u32),
    snapshots: bool,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            markers: BTreeMap::new(),
            offsets: HashMap::new(),
            polylines: BTreeMap::new(),
            tile_overlays: BTreeMap::new(),
            heatmap: None,
            clusters: BTreeMap::new(),
            circles: BTreeMap::new(),
            ops: Vec::new(),
            duplicate_attaches: 0,
            viewport: (256, 256),
            snapshots: true,
        }
    }

    /// Sets the snapshot size in pixels.
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = (width.max(1), height.max(1));
        self
    }

    /// Makes [`MapSurface::snapshot`] report the capability as missing.
    pub fn without_snapshots(mut self) -> Self {
        self.snapshots = false;
        self
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerState> {
        self.markers.get(id)
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerState> {
        self.markers.values()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker_offset(&self, id: &str) -> f32 {
        self.offsets.get(id).copied().unwrap_or(0.0)
    }

    pub fn polyline(&self, id: &str) -> Option<&PolylineEntity> {
        self.polylines.get(id)
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    pub fn tile_overlay(&self, id: &str) -> Option<&TileOverlayEntity> {
        self.tile_overlays.get(id)
    }

    pub fn tile_overlay_count(&self) -> usize {
        self.tile_overlays.len()
    }

    pub fn heatmap(&self) -> Option<&HeatmapState> {
        self.heatmap.as_ref()
    }

    pub fn clusters(&self) -> impl Iterator<Item = &ClusterVisual> {
        self.clusters.values()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn circle(&self, id: &str) -> Option<&CircleVisual> {
        self.circles.get(id)
    }

    pub fn circle_count(&self) -> usize {
        self.circles.len()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Number of attach calls rejected because the id was already on screen.
    pub fn duplicate_attaches(&self) -> usize {
        self.duplicate_attaches
    }

    fn attach<T>(
        map: &mut BTreeMap<String, T>,
        duplicates: &mut usize,
        kind: &'static str,
        id: &str,
        value: T,
    ) -> Result<(), SurfaceError> {
        if map.contains_key(id) {
            *duplicates += 1;
            return Err(SurfaceError::AlreadyAttached {
                kind,
                id: id.to_string(),
            });
        }
        map.insert(id.to_string(), value);
        Ok(())
    }

    fn detach<T>(
        map: &mut BTreeMap<String, T>,
        kind: &'static str,
        id: &str,
    ) -> Result<(), SurfaceError> {
        map.remove(id)
            .map(|_| ())
            .ok_or_else(|| SurfaceError::UnknownVisual {
                kind,
                id: id.to_string(),
            })
    }

    fn render(&self) -> RgbaImage {
        let (width, height) = self.viewport;
        let mut image = RgbaImage::from_pixel(width, height, Rgba([240, 240, 240, 255]));

        // Plot markers and clusters at zoom 0, scaled into the viewport
        let positions: Vec<(LatLng, Rgba<u8>)> = self
            .markers
            .values()
            .map(|m| (m.entity.position, Rgba([200, 30, 30, 255])))
            .chain(
                self.clusters
                    .values()
                    .map(|c| (c.position, Rgba([30, 30, 200, 255]))),
            )
            .collect();
        for (position, color) in positions {
            let p = world_point(position, 0.0);
            let x = (p.x / 256.0 * width as f64) as u32;
            let y = (p.y / 256.0 * height as f64) as u32;
            if x < width && y < height {
                image.put_pixel(x, y, color);
            }
        }
        image
    }
}

impl MapSurface for RecordingSurface {
    fn attach_marker(&mut self, marker: &MarkerState) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachMarker(marker.id().to_string()));
        Self::attach(
            &mut self.markers,
            &mut self.duplicate_attaches,
            "marker",
            marker.id(),
            marker.clone(),
        )
    }

    fn update_marker(&mut self, marker: &MarkerState) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::UpdateMarker(marker.id().to_string()));
        match self.markers.get_mut(marker.id()) {
            Some(existing) => {
                *existing = marker.clone();
                Ok(())
            }
            None => Err(SurfaceError::UnknownVisual {
                kind: "marker",
                id: marker.id().to_string(),
            }),
        }
    }

    fn detach_marker(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachMarker(id.to_string()));
        self.offsets.remove(id);
        Self::detach(&mut self.markers, "marker", id)
    }

    fn set_marker_offset(&mut self, id: &str, offset_px: f32) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::MarkerOffset(id.to_string(), offset_px));
        if !self.markers.contains_key(id) {
            return Err(SurfaceError::UnknownVisual {
                kind: "marker",
                id: id.to_string(),
            });
        }
        if offset_px == 0.0 {
            self.offsets.remove(id);
        } else {
            self.offsets.insert(id.to_string(), offset_px);
        }
        Ok(())
    }

    fn attach_polyline(&mut self, polyline: &PolylineEntity) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachPolyline(polyline.id.clone()));
        Self::attach(
            &mut self.polylines,
            &mut self.duplicate_attaches,
            "polyline",
            &polyline.id,
            polyline.clone(),
        )
    }

    fn detach_polyline(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachPolyline(id.to_string()));
        Self::detach(&mut self.polylines, "polyline", id)
    }

    fn attach_tile_overlay(&mut self, overlay: &TileOverlayEntity) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachTileOverlay(overlay.id.clone()));
        Self::attach(
            &mut self.tile_overlays,
            &mut self.duplicate_attaches,
            "tile overlay",
            &overlay.id,
            overlay.clone(),
        )
    }

    fn detach_tile_overlay(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachTileOverlay(id.to_string()));
        Self::detach(&mut self.tile_overlays, "tile overlay", id)
    }

    fn attach_heatmap(&mut self, heatmap: &HeatmapState) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachHeatmap);
        if self.heatmap.is_some() {
            self.duplicate_attaches += 1;
            return Err(SurfaceError::AlreadyAttached {
                kind: "heatmap",
                id: String::new(),
            });
        }
        self.heatmap = Some(heatmap.clone());
        Ok(())
    }

    fn detach_heatmap(&mut self) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachHeatmap);
        self.heatmap
            .take()
            .map(|_| ())
            .ok_or(SurfaceError::UnknownVisual {
                kind: "heatmap",
                id: String::new(),
            })
    }

    fn attach_cluster(&mut self, cluster: &ClusterVisual) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachCluster(cluster.key.clone()));
        Self::attach(
            &mut self.clusters,
            &mut self.duplicate_attaches,
            "cluster",
            &cluster.key,
            cluster.clone(),
        )
    }

    fn detach_cluster(&mut self, key: &str) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachCluster(key.to_string()));
        Self::detach(&mut self.clusters, "cluster", key)
    }

    fn attach_circle(&mut self, circle: &CircleVisual) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::AttachCircle(circle.id.clone()));
        Self::attach(
            &mut self.circles,
            &mut self.duplicate_attaches,
            "circle",
            &circle.id,
            circle.clone(),
        )
    }

    fn update_circle(&mut self, circle: &CircleVisual) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::UpdateCircle(circle.id.clone()));
        match self.circles.get_mut(&circle.id) {
            Some(existing) => {
                *existing = circle.clone();
                Ok(())
            }
            None => Err(SurfaceError::UnknownVisual {
                kind: "circle",
                id: circle.id.clone(),
            }),
        }
    }

    fn detach_circle(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.ops.push(SurfaceOp::DetachCircle(id.to_string()));
        Self::detach(&mut self.circles, "circle", id)
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, SurfaceError> {
        self.ops.push(SurfaceOp::Snapshot);
        if !self.snapshots {
            return Err(SurfaceError::Unsupported(Capability::Snapshot));
        }
        let mut cursor = Cursor::new(Vec::new());
        self.render()
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| SurfaceError::Adapter(e.to_string()))?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MarkerEntity;

    fn marker(id: &str) -> MarkerState {
        MarkerState::new(MarkerEntity::new(id, LatLng::new(10.0, 20.0)))
    }

    #[test]
    fn test_duplicate_attach_is_rejected_and_counted() {
        let mut surface = RecordingSurface::new();
        surface.attach_marker(&marker("m1")).unwrap();
        let err = surface.attach_marker(&marker("m1")).unwrap_err();
        assert!(matches!(err, SurfaceError::AlreadyAttached { .. }));
        assert_eq!(surface.duplicate_attaches(), 1);
        assert_eq!(surface.marker_count(), 1);
    }

    #[test]
    fn test_detach_unknown_reports_error() {
        let mut surface = RecordingSurface::new();
        assert!(surface.detach_polyline("nope").is_err());
    }

    #[test]
    fn test_offsets_cleared_on_detach() {
        let mut surface = RecordingSurface::new();
        surface.attach_marker(&marker("m1")).unwrap();
        surface.set_marker_offset("m1", -12.0).unwrap();
        assert_eq!(surface.marker_offset("m1"), -12.0);
        surface.detach_marker("m1").unwrap();
        assert_eq!(surface.marker_offset("m1"), 0.0);
    }

    #[test]
    fn test_snapshot_is_png_of_viewport() {
        let mut surface = RecordingSurface::new().with_viewport(32, 16);
        surface.attach_marker(&marker("m1")).unwrap();
        let png = surface.snapshot().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_snapshot_unsupported() {
        let mut surface = RecordingSurface::new().without_snapshots();
        assert_eq!(
            surface.snapshot(),
            Err(SurfaceError::Unsupported(Capability::Snapshot))
        );
    }

    #[test]
    fn test_ops_are_logged_in_order() {
        let mut surface = RecordingSurface::new();
        surface.attach_marker(&marker("m1")).unwrap();
        surface.update_marker(&marker("m1")).unwrap();
        surface.detach_marker("m1").unwrap();
        assert_eq!(
            surface.ops(),
            &[
                SurfaceOp::AttachMarker("m1".into()),
                SurfaceOp::UpdateMarker("m1".into()),
                SurfaceOp::DetachMarker("m1".into()),
            ]
        );
    }
}
