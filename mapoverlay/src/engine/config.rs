//! Engine configuration.

use std::time::Duration;

use crate::animation::{AnimationConfig, BounceParams, PulseParams};
use crate::cluster::ClusterConfig;
use crate::config::ConfigFile;
use crate::geo::Argb;
use crate::icon::{DiskIconCacheConfig, IconCacheConfig};

/// Everything needed to build an [`OverlayEngine`](super::OverlayEngine).
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub icons: IconCacheConfig,
    pub clustering: ClusterConfig,
    /// Start with clustering switched on
    pub clustering_enabled: bool,
    pub animation: AnimationConfig,
}

impl EngineConfig {
    pub fn with_icons(mut self, icons: IconCacheConfig) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_clustering(mut self, clustering: ClusterConfig) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn with_clustering_enabled(mut self, enabled: bool) -> Self {
        self.clustering_enabled = enabled;
        self
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }
}

impl From<&ConfigFile> for EngineConfig {
    fn from(file: &ConfigFile) -> Self {
        let icons = &file.icons;
        // A zero disk budget turns the disk tier off
        let disk = (icons.disk_size > 0 && icons.disk_max_files > 0).then(|| DiskIconCacheConfig {
            directory: icons.directory.clone(),
            max_bytes: icons.disk_size,
            max_files: icons.disk_max_files,
        });

        let anim = &file.animation;
        let defaults = AnimationConfig::default();

        Self {
            icons: IconCacheConfig {
                memory_bytes: icons.memory_size,
                disk,
                default_size_points: icons.default_size,
                device_scale: icons.device_scale,
                fetch_timeout: Duration::from_secs(icons.fetch_timeout),
                asset_root: icons.asset_root.clone(),
            },
            clustering: ClusterConfig::default()
                .with_distance_px(file.clustering.distance)
                .with_zoom(file.clustering.zoom),
            clustering_enabled: file.clustering.enabled,
            animation: AnimationConfig {
                bounce: BounceParams {
                    duration: Duration::from_millis(anim.bounce_duration_ms),
                    height_points: anim.bounce_height,
                    ..defaults.bounce
                },
                pulse: PulseParams {
                    duration: Duration::from_millis(anim.pulse_duration_ms),
                    max_radius_meters: anim.pulse_max_radius,
                    color: Argb(anim.pulse_color),
                    ..defaults.pulse
                },
                device_scale: icons.device_scale,
            },
        }
    }
}
