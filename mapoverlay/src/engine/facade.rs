//! The owning context for all overlay state.

use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::error::EngineError;
use super::events::EngineEvent;
use crate::animation::{AnimationScheduler, BounceParams, MarkerLookup, PulseParams, TickReport};
use crate::cluster::ClusterEngine;
use crate::geo::{Anchor, LatLng};
use crate::icon::{
    Bitmap, IconCache, IconCacheStats, IconCompletion, IconKey, IconRef, IconSource, IconTarget,
    Resolution,
};
use crate::registry::{
    FlushReport, HeatmapState, MarkerEntity, MarkerPatch, MarkerState, OverlayRegistry,
    PolylineEntity, TileOverlayEntity,
};
use crate::surface::MapSurface;

/// Last camera position the host reported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub target: Option<LatLng>,
    pub zoom: f64,
}

/// Overlay state engine bound to one map surface.
///
/// Markers live in the [`OverlayRegistry`] while clustering is off and in
/// the [`ClusterEngine`] while it is on; never in both. Registry mutations
/// are coalesced until [`OverlayEngine::flush`].
pub struct OverlayEngine<S: MapSurface> {
    config: EngineConfig,
    surface: S,
    registry: OverlayRegistry,
    clusters: ClusterEngine,
    animations: AnimationScheduler,
    icons: IconCache,
    camera: CameraState,
    events: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl<S: MapSurface> OverlayEngine<S> {
    /// Creates an engine that fetches remote icons over HTTP.
    pub fn new(config: EngineConfig, surface: S) -> Result<Self, EngineError> {
        let icons = IconCache::new(config.icons.clone())?;
        Ok(Self::with_icon_cache(config, surface, icons))
    }

    /// Creates an engine around an existing icon cache.
    pub fn with_icon_cache(config: EngineConfig, surface: S, icons: IconCache) -> Self {
        let mut engine = Self {
            surface,
            registry: OverlayRegistry::new(),
            clusters: ClusterEngine::new(config.clustering.clone()),
            animations: AnimationScheduler::new(config.animation.clone()),
            icons,
            camera: CameraState {
                target: None,
                zoom: config.clustering.zoom,
            },
            events: None,
            config,
        };
        if engine.config.clustering_enabled {
            engine.set_clustering_enabled(true);
        }
        engine
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn registry(&self) -> &OverlayRegistry {
        &self.registry
    }

    pub fn clusters(&self) -> &ClusterEngine {
        &self.clusters
    }

    pub fn animations(&self) -> &AnimationScheduler {
        &self.animations
    }

    pub fn icon_stats(&self) -> IconCacheStats {
        self.icons.stats()
    }

    pub fn camera(&self) -> CameraState {
        self.camera
    }

    /// Routes tap events to a new receiver, replacing any previous one.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<EngineEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    // ---- markers ----

    /// Current state of a marker, wherever it lives.
    pub fn marker(&self, id: &str) -> Option<&MarkerState> {
        if self.clusters.is_enabled() {
            self.clusters.item(id).map(|item| &item.state)
        } else {
            self.registry.marker(id)
        }
    }

    pub fn marker_count(&self) -> usize {
        if self.clusters.is_enabled() {
            self.clusters.len()
        } else {
            self.registry.marker_count()
        }
    }

    /// Inserts or replaces a marker and starts resolving its icon.
    pub fn upsert_marker(&mut self, entity: MarkerEntity) {
        let mut state = MarkerState::new(entity);
        state.icon = self.resolve_marker_icon(&state.entity);
        debug!(id = state.id(), icon = state.icon.is_some(), "Marker upserted");
        if self.clusters.is_enabled() {
            self.clusters.upsert(state);
        } else {
            self.registry.insert_marker_state(state);
        }
    }

    /// Applies a partial update. Unknown ids are ignored.
    pub fn update_marker(&mut self, id: &str, patch: MarkerPatch) -> bool {
        let updated = if self.clusters.is_enabled() {
            self.clusters.update(id, &patch)
        } else {
            self.registry.update_marker(id, &patch)
        };
        if !updated {
            debug!(id = id, "Update for unknown marker ignored");
            return false;
        }

        if let Some(icon) = &patch.icon {
            if let Resolution::Ready(bitmap) =
                self.icons.resolve(icon, IconTarget::Marker(id.to_string()))
            {
                self.set_resolved_icon(id, Some(bitmap));
            }
        }
        true
    }

    /// Replaces a marker's icon with inline image bytes.
    pub fn set_marker_icon_bytes(
        &mut self,
        id: &str,
        bytes: Vec<u8>,
        anchor: Option<Anchor>,
    ) -> bool {
        let icon = IconRef::new(
            IconSource::inline(bytes),
            self.config.icons.default_size_points,
        );
        self.update_marker(
            id,
            MarkerPatch {
                icon: Some(icon),
                anchor,
                ..MarkerPatch::default()
            },
        )
    }

    /// Removes a marker and everything animating it.
    pub fn remove_marker(&mut self, id: &str) -> bool {
        self.animations.cancel_all_for(id, &mut self.surface);
        let removed = if self.clusters.is_enabled() {
            self.clusters.remove(id)
        } else {
            self.registry.remove_marker(id)
        };
        removed.is_some()
    }

    pub fn clear_markers(&mut self) {
        let ids = if self.clusters.is_enabled() {
            self.clusters.clear()
        } else {
            self.registry.clear_markers()
        };
        for id in &ids {
            self.animations.cancel_all_for(id, &mut self.surface);
        }
        debug!(count = ids.len(), "Markers cleared");
    }

    // ---- polylines, tiles, heatmap ----

    pub fn add_polyline(&mut self, polyline: PolylineEntity) {
        self.registry.add_polyline(polyline);
    }

    pub fn update_polyline_points(&mut self, id: &str, points: Vec<LatLng>) -> bool {
        self.registry.update_polyline_points(id, points)
    }

    pub fn remove_polyline(&mut self, id: &str) -> bool {
        self.registry.remove_polyline(id)
    }

    pub fn clear_polylines(&mut self) {
        self.registry.clear_polylines();
    }

    pub fn add_tile_overlay(&mut self, overlay: TileOverlayEntity) {
        self.registry.add_tile_overlay(overlay);
    }

    pub fn remove_tile_overlay(&mut self, id: &str) -> bool {
        self.registry.remove_tile_overlay(id)
    }

    pub fn clear_tile_overlays(&mut self) {
        self.registry.clear_tile_overlays();
    }

    /// URL of one tile of a tile overlay.
    pub fn tile_url(&self, id: &str, x: u32, y: u32, z: u32) -> Option<String> {
        self.registry
            .tile_overlay(id)
            .map(|overlay| overlay.tile_url(x, y, z))
    }

    pub fn set_heatmap(&mut self, heatmap: HeatmapState) {
        self.registry.set_heatmap(heatmap);
    }

    pub fn clear_heatmap(&mut self) {
        self.registry.clear_heatmap();
    }

    // ---- map ----

    /// Switches clustering mode, migrating every marker.
    pub fn set_clustering_enabled(&mut self, enabled: bool) {
        self.registry.flush(&mut self.surface);
        self.clusters.set_enabled(
            enabled,
            &mut self.registry,
            &mut self.surface,
            &mut self.icons,
        );
    }

    /// Records a camera move. A zoom change re-clusters.
    pub fn move_camera(&mut self, target: Option<LatLng>, zoom: Option<f64>) {
        if target.is_some() {
            self.camera.target = target;
        }
        if let Some(zoom) = zoom.filter(|z| z.is_finite()) {
            self.camera.zoom = zoom;
            self.clusters.set_zoom(zoom);
        }
    }

    /// Encoded image of the map with all pending changes applied.
    pub fn take_snapshot(&mut self) -> Option<Vec<u8>> {
        self.flush();
        match self.surface.snapshot() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!(error = %e, "Snapshot failed");
                None
            }
        }
    }

    // ---- animation ----

    /// Starts a bounce. Unknown ids are ignored.
    pub fn start_bounce(&mut self, id: &str, params: BounceParams) -> bool {
        if self.marker(id).is_none() {
            debug!(id = id, "Bounce for unknown marker ignored");
            return false;
        }
        self.animations.start_bounce(id, params, Instant::now());
        true
    }

    pub fn stop_bounce(&mut self, id: &str) -> bool {
        let markers = LiveMarkers {
            registry: &self.registry,
            clusters: &self.clusters,
        };
        self.animations.stop_bounce(id, &markers, &mut self.surface)
    }

    /// Starts a pulse. Unknown ids are ignored.
    pub fn start_pulse(&mut self, id: &str, params: PulseParams) -> bool {
        if self.marker(id).is_none() {
            debug!(id = id, "Pulse for unknown marker ignored");
            return false;
        }
        self.animations.start_pulse(id, params, Instant::now());
        true
    }

    pub fn stop_pulse(&mut self, id: &str) -> bool {
        self.animations.stop_pulse(id, &mut self.surface)
    }

    /// One frame: applies finished icons, flushes, then advances animations.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        self.poll_icons();
        self.flush();
        let markers = LiveMarkers {
            registry: &self.registry,
            clusters: &self.clusters,
        };
        self.animations.tick(now, &markers, &mut self.surface)
    }

    // ---- icons ----

    /// Applies every icon fetch that has finished. Returns how many targets
    /// received a bitmap.
    pub fn poll_icons(&mut self) -> usize {
        let completions = self.icons.take_completions();
        completions
            .into_iter()
            .map(|completion| self.apply_completion(completion))
            .sum()
    }

    /// Waits until no icon fetch is in flight, applying each as it lands,
    /// then flushes.
    pub async fn wait_icons(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.icons.next_completion().await {
            applied += self.apply_completion(completion);
        }
        self.flush();
        applied
    }

    pub fn pending_icons(&self) -> usize {
        self.icons.pending_fetches()
    }

    pub fn on_memory_pressure(&mut self) {
        self.icons.on_memory_pressure();
    }

    // ---- lifecycle ----

    /// Pushes pending changes to the surface.
    pub fn flush(&mut self) -> FlushReport {
        let report = self.registry.flush(&mut self.surface);
        self.clusters.flush(&mut self.surface, &mut self.icons);
        report
    }

    /// Tears down every overlay and cancels all background work.
    ///
    /// The engine stays usable afterwards, starting from an empty map.
    pub fn dispose(&mut self) {
        self.icons.cancel_all();
        self.animations.cancel_all(&mut self.surface);
        self.clusters.clear();
        self.registry.clear_markers();
        self.registry.clear_polylines();
        self.registry.clear_tile_overlays();
        self.registry.clear_heatmap();
        self.flush();
        info!("Overlay engine disposed");
    }

    // ---- events ----

    /// Reports a tap on a plain marker visual.
    pub fn handle_marker_tap(&mut self, id: &str) -> bool {
        if self.marker(id).is_none() {
            return false;
        }
        self.emit(EngineEvent::MarkerTap { id: id.to_string() })
    }

    /// Reports a tap on a cluster visual.
    pub fn handle_cluster_tap(&mut self, key: &str) -> bool {
        let Some(ids) = self.clusters.cluster_members(key) else {
            return false;
        };
        let ids = ids.to_vec();
        self.emit(EngineEvent::ClusterTap { ids })
    }

    fn emit(&mut self, event: EngineEvent) -> bool {
        let Some(tx) = &self.events else {
            return false;
        };
        if tx.send(event).is_err() {
            debug!("Event receiver dropped");
            self.events = None;
            return false;
        }
        true
    }

    fn resolve_marker_icon(&mut self, entity: &MarkerEntity) -> Option<Bitmap> {
        let icon = entity.icon.as_ref()?;
        match self
            .icons
            .resolve(icon, IconTarget::Marker(entity.id.clone()))
        {
            Resolution::Ready(bitmap) => Some(bitmap),
            Resolution::Pending | Resolution::Unavailable => None,
        }
    }

    fn set_resolved_icon(&mut self, id: &str, icon: Option<Bitmap>) -> bool {
        if self.clusters.is_enabled() {
            self.clusters.set_item_icon(id, icon)
        } else {
            self.registry.set_marker_icon(id, icon)
        }
    }

    fn marker_icon_key(&self, id: &str) -> Option<IconKey> {
        self.marker(id)?.entity.icon.as_ref().map(IconRef::key)
    }

    fn apply_completion(&mut self, completion: IconCompletion) -> usize {
        let Some(bitmap) = completion.bitmap else {
            return 0;
        };
        let mut applied = 0;
        for target in completion.targets {
            let delivered = match &target {
                IconTarget::Marker(id) => {
                    if self.marker_icon_key(id).as_ref() == Some(&completion.key) {
                        self.set_resolved_icon(id, Some(bitmap.clone()))
                    } else {
                        false
                    }
                }
                IconTarget::Cluster(key) => self.clusters.apply_cluster_icon(
                    key,
                    &completion.key,
                    bitmap.clone(),
                    &mut self.surface,
                ),
            };
            if delivered {
                applied += 1;
            } else {
                debug!(key = %completion.key, target = ?target, "Dropping stale icon");
            }
        }
        applied
    }
}

/// Marker positions as the animation scheduler sees them.
struct LiveMarkers<'a> {
    registry: &'a OverlayRegistry,
    clusters: &'a ClusterEngine,
}

impl MarkerLookup for LiveMarkers<'_> {
    fn marker_position(&self, id: &str) -> Option<LatLng> {
        if self.clusters.is_enabled() {
            self.clusters.position(id)
        } else {
            self.registry.marker_position(id)
        }
    }

    fn is_rendered(&self, id: &str) -> bool {
        if self.clusters.is_enabled() {
            self.clusters.is_rendered_marker(id)
        } else {
            self.registry.is_marker_attached(id)
        }
    }
}
