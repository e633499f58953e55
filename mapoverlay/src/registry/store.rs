//! The authoritative entity store.

use std::collections::{BTreeMap, HashSet};
use std::mem;
use tracing::debug;

use super::pending::{PendingChanges, PendingMarker};
use super::types::{
    HeatmapState, MarkerEntity, MarkerPatch, MarkerState, PolylineEntity, TileOverlayEntity,
};
use crate::geo::LatLng;
use crate::icon::Bitmap;
use crate::surface::{report, MapSurface};

/// Surface calls made by one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub attached: usize,
    pub updated: usize,
    pub detached: usize,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.attached + self.updated + self.detached
    }
}

/// Markers, polylines, tile overlays and the heatmap, keyed by host id.
///
/// Mutations only record pending changes. [`OverlayRegistry::flush`] pushes
/// them to the surface in one pass, so several edits to one id between
/// flushes cost a single surface call.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    markers: BTreeMap<String, MarkerState>,
    polylines: BTreeMap<String, PolylineEntity>,
    tile_overlays: BTreeMap<String, TileOverlayEntity>,
    heatmap: Option<HeatmapState>,

    attached_markers: HashSet<String>,
    attached_polylines: HashSet<String>,
    attached_tile_overlays: HashSet<String>,
    heatmap_attached: bool,

    pending: PendingChanges,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- markers ----

    /// Inserts or replaces a marker. Any previously resolved icon is dropped.
    pub fn upsert_marker(&mut self, entity: MarkerEntity) {
        self.insert_marker_state(MarkerState::new(entity));
    }

    /// Inserts a full marker state, replacing any marker with the same id.
    pub fn insert_marker_state(&mut self, state: MarkerState) {
        let id = state.id().to_string();
        self.pending.mark_marker(&id, PendingMarker::Replace);
        self.markers.insert(id, state);
    }

    /// Applies `patch` to a marker. Returns `false` for an unknown id.
    pub fn update_marker(&mut self, id: &str, patch: &MarkerPatch) -> bool {
        let Some(state) = self.markers.get_mut(id) else {
            return false;
        };
        state.entity.apply(patch);
        if patch.icon.is_some() {
            state.icon = None;
        }
        self.pending.mark_marker(id, PendingMarker::Update);
        true
    }

    /// Sets or clears a marker's resolved icon. Returns `false` for an unknown id.
    pub fn set_marker_icon(&mut self, id: &str, icon: Option<Bitmap>) -> bool {
        let Some(state) = self.markers.get_mut(id) else {
            return false;
        };
        state.icon = icon;
        self.pending.mark_marker(id, PendingMarker::Update);
        true
    }

    pub fn remove_marker(&mut self, id: &str) -> Option<MarkerState> {
        let removed = self.markers.remove(id)?;
        self.pending.mark_marker(id, PendingMarker::Remove);
        Some(removed)
    }

    /// Removes every marker and returns their ids.
    pub fn clear_markers(&mut self) -> Vec<String> {
        self.take_markers()
            .into_iter()
            .map(|state| state.entity.id)
            .collect()
    }

    /// Removes every marker and returns their full states in id order.
    pub fn take_markers(&mut self) -> Vec<MarkerState> {
        let markers = mem::take(&mut self.markers);
        for id in markers.keys() {
            self.pending.mark_marker(id, PendingMarker::Remove);
        }
        markers.into_values().collect()
    }

    pub fn marker(&self, id: &str) -> Option<&MarkerState> {
        self.markers.get(id)
    }

    pub fn marker_position(&self, id: &str) -> Option<LatLng> {
        self.markers.get(id).map(|m| m.entity.position)
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerState> {
        self.markers.values()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Whether a visual for `id` is currently on the surface.
    pub fn is_marker_attached(&self, id: &str) -> bool {
        self.attached_markers.contains(id)
    }

    // ---- polylines ----

    /// Adds a polyline, replacing any polyline with the same id.
    pub fn add_polyline(&mut self, polyline: PolylineEntity) {
        self.pending.polylines.insert(polyline.id.clone());
        self.polylines.insert(polyline.id.clone(), polyline);
    }

    pub fn update_polyline_points(&mut self, id: &str, points: Vec<LatLng>) -> bool {
        let Some(polyline) = self.polylines.get_mut(id) else {
            return false;
        };
        polyline.points = points;
        self.pending.polylines.insert(id.to_string());
        true
    }

    pub fn remove_polyline(&mut self, id: &str) -> bool {
        if self.polylines.remove(id).is_none() {
            return false;
        }
        self.pending.polylines.insert(id.to_string());
        true
    }

    pub fn clear_polylines(&mut self) {
        for id in mem::take(&mut self.polylines).into_keys() {
            self.pending.polylines.insert(id);
        }
    }

    pub fn polyline(&self, id: &str) -> Option<&PolylineEntity> {
        self.polylines.get(id)
    }

    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    // ---- tile overlays ----

    /// Adds a tile overlay, replacing any overlay with the same id.
    pub fn add_tile_overlay(&mut self, overlay: TileOverlayEntity) {
        self.pending.tile_overlays.insert(overlay.id.clone());
        self.tile_overlays.insert(overlay.id.clone(), overlay);
    }

    pub fn remove_tile_overlay(&mut self, id: &str) -> bool {
        if self.tile_overlays.remove(id).is_none() {
            return false;
        }
        self.pending.tile_overlays.insert(id.to_string());
        true
    }

    pub fn clear_tile_overlays(&mut self) {
        for id in mem::take(&mut self.tile_overlays).into_keys() {
            self.pending.tile_overlays.insert(id);
        }
    }

    pub fn tile_overlay(&self, id: &str) -> Option<&TileOverlayEntity> {
        self.tile_overlays.get(id)
    }

    pub fn tile_overlay_count(&self) -> usize {
        self.tile_overlays.len()
    }

    // ---- heatmap ----

    pub fn set_heatmap(&mut self, heatmap: HeatmapState) {
        self.heatmap = Some(heatmap);
        self.pending.heatmap = true;
    }

    pub fn clear_heatmap(&mut self) {
        if self.heatmap.take().is_some() {
            self.pending.heatmap = true;
        }
    }

    pub fn heatmap(&self) -> Option<&HeatmapState> {
        self.heatmap.as_ref()
    }

    // ---- surface ----

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Applies every pending change to `surface` in one pass.
    pub fn flush(&mut self, surface: &mut dyn MapSurface) -> FlushReport {
        let pending = mem::take(&mut self.pending);
        let mut summary = FlushReport::default();

        for (id, change) in pending.markers {
            self.flush_marker(surface, &id, change, &mut summary);
        }

        for id in pending.polylines {
            if self.attached_polylines.remove(&id) {
                report(surface.detach_polyline(&id), "detach_polyline", &id);
                summary.detached += 1;
            }
            if let Some(polyline) = self.polylines.get(&id) {
                if report(surface.attach_polyline(polyline), "attach_polyline", &id) {
                    self.attached_polylines.insert(id);
                }
                summary.attached += 1;
            }
        }

        for id in pending.tile_overlays {
            if self.attached_tile_overlays.remove(&id) {
                report(surface.detach_tile_overlay(&id), "detach_tile_overlay", &id);
                summary.detached += 1;
            }
            if let Some(overlay) = self.tile_overlays.get(&id) {
                if report(surface.attach_tile_overlay(overlay), "attach_tile_overlay", &id) {
                    self.attached_tile_overlays.insert(id);
                }
                summary.attached += 1;
            }
        }

        if pending.heatmap {
            if self.heatmap_attached {
                report(surface.detach_heatmap(), "detach_heatmap", "heatmap");
                self.heatmap_attached = false;
                summary.detached += 1;
            }
            if let Some(heatmap) = &self.heatmap {
                self.heatmap_attached =
                    report(surface.attach_heatmap(heatmap), "attach_heatmap", "heatmap");
                summary.attached += 1;
            }
        }

        if summary.total() > 0 {
            debug!(
                attached = summary.attached,
                updated = summary.updated,
                detached = summary.detached,
                "Flushed overlay changes"
            );
        }
        summary
    }

    fn flush_marker(
        &mut self,
        surface: &mut dyn MapSurface,
        id: &str,
        change: PendingMarker,
        summary: &mut FlushReport,
    ) {
        let attached = self.attached_markers.contains(id);
        let state = match (change, self.markers.get(id)) {
            (PendingMarker::Remove, _) | (_, None) => None,
            (_, Some(state)) => Some(state),
        };

        match (change, state) {
            (PendingMarker::Update, Some(state)) if attached => {
                report(surface.update_marker(state), "update_marker", id);
                summary.updated += 1;
            }
            (_, Some(state)) => {
                if attached {
                    report(surface.detach_marker(id), "detach_marker", id);
                    summary.detached += 1;
                }
                let ok = report(surface.attach_marker(state), "attach_marker", id);
                summary.attached += 1;
                if ok {
                    self.attached_markers.insert(id.to_string());
                } else {
                    self.attached_markers.remove(id);
                }
            }
            (_, None) => {
                if self.attached_markers.remove(id) {
                    report(surface.detach_marker(id), "detach_marker", id);
                    summary.detached += 1;
                }
            }
        }
    }
}
