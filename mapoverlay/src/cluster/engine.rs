//! Clustering mode lifecycle.

use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use tracing::{debug, info};

use super::algorithm::group_items;
use super::types::{cluster_icon_size, ClusterConfig, ClusterItem, RenderedCluster};
use crate::geo::LatLng;
use crate::icon::{Bitmap, IconCache, IconKey, IconRef, IconTarget, Resolution};
use crate::registry::{MarkerPatch, MarkerState, OverlayRegistry};
use crate::surface::{report, ClusterVisual, MapSurface};

/// Prefix of every cluster visual key.
pub const CLUSTER_KEY_PREFIX: &str = "cluster:";

/// Alternate rendering mode for markers.
///
/// While enabled, markers live here as [`ClusterItem`]s instead of in the
/// registry. Every mutation marks the layout dirty and the next
/// [`ClusterEngine::flush`] re-clusters from scratch.
#[derive(Debug)]
pub struct ClusterEngine {
    config: ClusterConfig,
    enabled: bool,
    zoom: f64,
    items: BTreeMap<String, ClusterItem>,
    rendered_markers: BTreeSet<String>,
    rendered_clusters: BTreeMap<String, RenderedCluster>,
    dirty: bool,
}

impl ClusterEngine {
    pub fn new(config: ClusterConfig) -> Self {
        Self {
            zoom: config.zoom,
            config,
            enabled: false,
            items: BTreeMap::new(),
            rendered_markers: BTreeSet::new(),
            rendered_clusters: BTreeMap::new(),
            dirty: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Switches clustering on or off, migrating every marker across.
    ///
    /// Turning it on moves all registry markers into cluster items and
    /// detaches their plain visuals. Turning it off removes all cluster
    /// visuals and hands every item back to the registry unchanged.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        registry: &mut OverlayRegistry,
        surface: &mut dyn MapSurface,
        icons: &mut IconCache,
    ) {
        if enabled == self.enabled {
            return;
        }

        if enabled {
            let states = registry.take_markers();
            registry.flush(surface);
            info!(markers = states.len(), "Clustering enabled");
            self.enabled = true;
            for state in states {
                self.items
                    .insert(state.id().to_string(), ClusterItem::new(state));
            }
            self.dirty = true;
            self.flush(surface, icons);
        } else {
            self.detach_all(surface);
            self.enabled = false;
            self.dirty = false;
            let items = mem::take(&mut self.items);
            info!(markers = items.len(), "Clustering disabled");
            for item in items.into_values() {
                registry.insert_marker_state(item.state);
            }
            registry.flush(surface);
        }
    }

    /// Inserts or replaces an item.
    pub fn upsert(&mut self, state: MarkerState) {
        self.items
            .insert(state.id().to_string(), ClusterItem::new(state));
        self.dirty = true;
    }

    /// Applies a patch to an item. Returns `false` for an unknown id.
    pub fn update(&mut self, id: &str, patch: &MarkerPatch) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        item.state.entity.apply(patch);
        if patch.icon.is_some() {
            item.state.icon = None;
        }
        *item = ClusterItem::new(item.state.clone());
        self.dirty = true;
        true
    }

    /// Sets an item's resolved icon. Returns `false` for an unknown id.
    pub fn set_item_icon(&mut self, id: &str, icon: Option<Bitmap>) -> bool {
        let Some(item) = self.items.get_mut(id) else {
            return false;
        };
        item.state.icon = icon;
        self.dirty = true;
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<MarkerState> {
        let removed = self.items.remove(id)?;
        self.dirty = true;
        Some(removed.state)
    }

    /// Removes every item and returns their ids.
    pub fn clear(&mut self) -> Vec<String> {
        let ids: Vec<String> = mem::take(&mut self.items).into_keys().collect();
        self.dirty = true;
        ids
    }

    /// Changes the camera zoom used for grouping.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() && zoom != self.zoom {
            self.zoom = zoom;
            self.dirty = true;
        }
    }

    /// Forces a full re-cluster on the next flush.
    pub fn recluster(&mut self) {
        self.dirty = true;
    }

    pub fn item(&self, id: &str) -> Option<&ClusterItem> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &ClusterItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<LatLng> {
        self.items.get(id).map(|item| item.state.entity.position)
    }

    /// Whether `id` is currently drawn as a plain marker.
    pub fn is_rendered_marker(&self, id: &str) -> bool {
        self.rendered_markers.contains(id)
    }

    pub fn rendered_clusters(&self) -> impl Iterator<Item = &ClusterVisual> {
        self.rendered_clusters.values().map(|c| &c.visual)
    }

    /// Member ids of the cluster drawn under `key`.
    pub fn cluster_members(&self, key: &str) -> Option<&[String]> {
        self.rendered_clusters
            .get(key)
            .map(|c| c.visual.member_ids.as_slice())
    }

    /// Re-clusters if anything changed since the last flush.
    pub fn flush(&mut self, surface: &mut dyn MapSurface, icons: &mut IconCache) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        self.detach_all(surface);
        if !self.enabled {
            return true;
        }

        let groups = group_items(&self.items, self.zoom, self.config.distance_px);
        for group in groups {
            if group.is_singleton() {
                let id = &group.member_ids[0];
                if let Some(item) = self.items.get(id) {
                    if report(surface.attach_marker(&item.state), "attach_marker", id) {
                        self.rendered_markers.insert(id.clone());
                    }
                }
                continue;
            }

            let key = format!("{}{}", CLUSTER_KEY_PREFIX, group.member_ids[0]);
            let (icon, pending_icon) = self.resolve_cluster_icon(&key, &group.member_ids, icons);
            let visual = ClusterVisual {
                key: key.clone(),
                position: group.position,
                member_ids: group.member_ids,
                icon,
            };
            if report(surface.attach_cluster(&visual), "attach_cluster", &key) {
                self.rendered_clusters.insert(
                    key,
                    RenderedCluster {
                        visual,
                        pending_icon,
                    },
                );
            }
        }

        debug!(
            items = self.items.len(),
            markers = self.rendered_markers.len(),
            clusters = self.rendered_clusters.len(),
            zoom = self.zoom,
            "Re-clustered"
        );
        true
    }

    /// Applies a late cluster icon if the cluster is still drawn and still
    /// waiting for exactly this icon.
    pub fn apply_cluster_icon(
        &mut self,
        key: &str,
        icon_key: &IconKey,
        bitmap: Bitmap,
        surface: &mut dyn MapSurface,
    ) -> bool {
        let Some(cluster) = self.rendered_clusters.get_mut(key) else {
            return false;
        };
        if cluster.pending_icon.as_ref() != Some(icon_key) {
            return false;
        }
        cluster.pending_icon = None;
        cluster.visual.icon = Some(bitmap);
        report(surface.detach_cluster(key), "detach_cluster", key);
        report(surface.attach_cluster(&cluster.visual), "attach_cluster", key)
    }

    fn resolve_cluster_icon(
        &self,
        key: &str,
        member_ids: &[String],
        icons: &mut IconCache,
    ) -> (Option<Bitmap>, Option<IconKey>) {
        let Some(representative) = member_ids.first().and_then(|id| self.items.get(id)) else {
            return (None, None);
        };
        let Some(icon) = &representative.state.entity.icon else {
            return (None, None);
        };

        let size = cluster_icon_size(representative.icon_display_size, member_ids.len());
        let request = IconRef::new(icon.source.clone(), size);
        match icons.resolve(&request, IconTarget::Cluster(key.to_string())) {
            Resolution::Ready(bitmap) => (Some(bitmap), None),
            Resolution::Pending => (None, Some(request.key())),
            Resolution::Unavailable => (None, None),
        }
    }

    fn detach_all(&mut self, surface: &mut dyn MapSurface) {
        for id in mem::take(&mut self.rendered_markers) {
            report(surface.detach_marker(&id), "detach_marker", &id);
        }
        for key in mem::take(&mut self.rendered_clusters).into_keys() {
            report(surface.detach_cluster(&key), "detach_cluster", &key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::{test_png, IconCacheConfig, IconSource, ReqwestFetcher};
    use crate::registry::MarkerEntity;
    use crate::surface::RecordingSurface;
    use std::sync::Arc;
    use std::time::Duration;

    fn icons() -> IconCache {
        let fetcher = ReqwestFetcher::new(Duration::from_secs(1)).unwrap();
        IconCache::with_fetcher(IconCacheConfig::memory_only(), Arc::new(fetcher))
    }

    fn entity(id: &str, lat: f64, lng: f64) -> MarkerEntity {
        MarkerEntity::new(id, LatLng::new(lat, lng))
    }

    fn nearby_registry() -> OverlayRegistry {
        let mut registry = OverlayRegistry::new();
        registry.upsert_marker(entity("a", 10.0, 20.0).with_title("first"));
        registry.upsert_marker(entity("b", 10.0001, 20.0001).with_rotation(45.0));
        registry.upsert_marker(entity("c", 10.0002, 20.0));
        registry
    }

    #[test]
    fn test_enable_moves_markers_into_one_cluster() {
        let mut registry = nearby_registry();
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        registry.flush(&mut surface);

        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);

        assert_eq!(registry.marker_count(), 0);
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(surface.cluster_count(), 1);
        let cluster = surface.clusters().next().unwrap();
        assert_eq!(cluster.member_ids, vec!["a", "b", "c"]);
        assert_eq!(cluster.key, "cluster:a");
        assert_eq!(cluster.count(), 3);
    }

    #[test]
    fn test_round_trip_restores_markers_exactly() {
        let mut registry = nearby_registry();
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        registry.flush(&mut surface);
        let before: Vec<MarkerState> = registry.markers().cloned().collect();

        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);
        clusters.set_enabled(false, &mut registry, &mut surface, &mut icons);

        let after: Vec<MarkerState> = registry.markers().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(surface.marker_count(), 3);
        assert_eq!(surface.cluster_count(), 0);
        assert_eq!(surface.duplicate_attaches(), 0);
    }

    #[test]
    fn test_removing_members_leaves_singleton() {
        let mut registry = nearby_registry();
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);

        clusters.remove("a");
        clusters.remove("b");
        clusters.flush(&mut surface, &mut icons);

        assert_eq!(surface.cluster_count(), 0);
        assert_eq!(surface.marker_count(), 1);
        assert!(surface.marker("c").is_some());
        assert!(clusters.is_rendered_marker("c"));
    }

    #[test]
    fn test_update_moves_item_out_of_cluster() {
        let mut registry = nearby_registry();
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);

        assert!(clusters.update("c", &MarkerPatch::position(LatLng::new(-40.0, 100.0))));
        assert!(!clusters.update("ghost", &MarkerPatch::default()));
        clusters.flush(&mut surface, &mut icons);

        assert_eq!(surface.cluster_count(), 1);
        assert_eq!(surface.marker_count(), 1);
        assert_eq!(clusters.cluster_members("cluster:a").unwrap(), ["a", "b"]);
    }

    #[test]
    fn test_set_zoom_reclusters() {
        let mut registry = OverlayRegistry::new();
        registry.upsert_marker(entity("a", 10.0, 20.0));
        registry.upsert_marker(entity("b", 10.5, 20.5));
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);
        assert_eq!(surface.marker_count(), 2);

        clusters.set_zoom(2.0);
        assert!(clusters.flush(&mut surface, &mut icons));
        assert_eq!(surface.cluster_count(), 1);
        assert_eq!(surface.marker_count(), 0);
    }

    #[test]
    fn test_cluster_icon_from_representative() {
        let mut registry = OverlayRegistry::new();
        let icon = IconRef::new(IconSource::inline(test_png(200, 200)), 40);
        registry.upsert_marker(entity("a", 10.0, 20.0).with_icon(icon));
        registry.upsert_marker(entity("b", 10.0001, 20.0));
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        clusters.set_enabled(true, &mut registry, &mut surface, &mut icons);

        let cluster = surface.clusters().next().unwrap();
        assert_eq!(cluster.icon.as_ref().unwrap().longest_side(), 40);
    }

    #[test]
    fn test_flush_without_changes_is_noop() {
        let mut surface = RecordingSurface::new();
        let mut icons = icons();
        let mut clusters = ClusterEngine::new(ClusterConfig::default());
        assert!(!clusters.flush(&mut surface, &mut icons));
        assert!(surface.ops().is_empty());
    }
}
