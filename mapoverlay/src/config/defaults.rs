//! Default values for all configuration settings, and `ConfigFile::default()`.

use std::path::PathBuf;

use super::settings::*;
use crate::animation::{
    DEFAULT_BOUNCE_DURATION, DEFAULT_BOUNCE_HEIGHT_POINTS, DEFAULT_PULSE_COLOR,
    DEFAULT_PULSE_DURATION, DEFAULT_PULSE_MAX_RADIUS_METERS,
};
use crate::cluster::{DEFAULT_CLUSTER_DISTANCE_PX, DEFAULT_CLUSTER_ZOOM};
use crate::icon::{
    default_icon_directory, DEFAULT_DISK_CACHE_BYTES, DEFAULT_DISK_MAX_FILES,
    DEFAULT_FETCH_TIMEOUT, DEFAULT_ICON_SIZE_POINTS, DEFAULT_MEMORY_CACHE_BYTES,
};

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE_NAME: &str = "mapoverlay.log";

/// Largest accepted device scale.
pub const MAX_DEVICE_SCALE: f32 = 8.0;

/// Default log file path (~/.mapoverlay/mapoverlay.log).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join(DEFAULT_LOG_FILE_NAME)
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            icons: IconSettings {
                directory: default_icon_directory(),
                memory_size: DEFAULT_MEMORY_CACHE_BYTES,
                disk_size: DEFAULT_DISK_CACHE_BYTES,
                disk_max_files: DEFAULT_DISK_MAX_FILES,
                default_size: DEFAULT_ICON_SIZE_POINTS,
                device_scale: 1.0,
                fetch_timeout: DEFAULT_FETCH_TIMEOUT.as_secs(),
                asset_root: PathBuf::from("."),
            },
            clustering: ClusteringSettings {
                enabled: false,
                distance: DEFAULT_CLUSTER_DISTANCE_PX,
                zoom: DEFAULT_CLUSTER_ZOOM,
            },
            animation: AnimationSettings {
                bounce_duration_ms: DEFAULT_BOUNCE_DURATION.as_millis() as u64,
                bounce_height: DEFAULT_BOUNCE_HEIGHT_POINTS,
                pulse_duration_ms: DEFAULT_PULSE_DURATION.as_millis() as u64,
                pulse_max_radius: DEFAULT_PULSE_MAX_RADIUS_METERS,
                pulse_color: DEFAULT_PULSE_COLOR.0,
            },
            logging: LoggingSettings {
                file: default_log_file(),
            },
        }
    }
}
