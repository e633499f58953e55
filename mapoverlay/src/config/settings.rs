//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Icon cache settings
    pub icons: IconSettings,
    /// Marker clustering settings
    pub clustering: ClusteringSettings,
    /// Default animation parameters
    pub animation: AnimationSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Icon cache configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSettings {
    /// Disk cache directory
    pub directory: PathBuf,
    /// Memory cache size in bytes
    pub memory_size: usize,
    /// Disk cache size in bytes; 0 disables the disk tier
    pub disk_size: u64,
    /// Maximum number of files in the disk cache
    pub disk_max_files: usize,
    /// Icon size in points when a request carries none
    pub default_size: u32,
    /// Pixels per point
    pub device_scale: f32,
    /// Remote fetch timeout in seconds
    pub fetch_timeout: u64,
    /// Root for bundled asset paths
    pub asset_root: PathBuf,
}

/// Clustering configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringSettings {
    /// Start with clustering on
    pub enabled: bool,
    /// Grouping distance in pixels
    pub distance: f64,
    /// Initial camera zoom
    pub zoom: f64,
}

/// Animation defaults used when a start command omits a field.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSettings {
    pub bounce_duration_ms: u64,
    /// Points
    pub bounce_height: f32,
    pub pulse_duration_ms: u64,
    /// Meters
    pub pulse_max_radius: f64,
    /// `0xAARRGGBB`
    pub pulse_color: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}
