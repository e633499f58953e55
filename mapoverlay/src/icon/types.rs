//! Icon cache error, configuration and statistics types.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::fetch::FetchError;

/// Default memory budget for decoded icons (12 MB).
pub const DEFAULT_MEMORY_CACHE_BYTES: usize = 12 * 1024 * 1024;

/// Default on-disk budget for fetched icons (50 MB).
pub const DEFAULT_DISK_CACHE_BYTES: u64 = 50 * 1024 * 1024;

/// Default maximum number of files kept in the disk cache.
pub const DEFAULT_DISK_MAX_FILES: usize = 500;

/// Default icon size in points when a request does not name one.
pub const DEFAULT_ICON_SIZE_POINTS: u32 = 48;

/// Default timeout for remote icon fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(4);

/// Errors raised while resolving an icon.
///
/// These never leave the engine: a failed resolution is logged and the
/// marker keeps its default appearance.
#[derive(Debug, Error)]
pub enum IconError {
    /// Bytes could not be decoded as an image
    #[error("Failed to decode icon: {0}")]
    Decode(String),

    /// Bitmap could not be re-encoded for the disk cache
    #[error("Failed to encode icon: {0}")]
    Encode(String),

    /// Disk cache or asset I/O failure
    #[error("Icon I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Icon descriptor could not be parsed
    #[error("Invalid icon source '{0}'")]
    InvalidSource(String),

    /// Remote fetch failed
    #[error("Failed to fetch icon: {0}")]
    Fetch(#[from] FetchError),

    /// Bundled asset does not exist under the asset root
    #[error("Icon asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),
}

/// Disk tier configuration.
#[derive(Debug, Clone)]
pub struct DiskIconCacheConfig {
    /// Flat directory holding `<hash>.png` files
    pub directory: PathBuf,
    /// Byte budget enforced after every write
    pub max_bytes: u64,
    /// File-count budget enforced after every write
    pub max_files: usize,
}

impl Default for DiskIconCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_icon_directory(),
            max_bytes: DEFAULT_DISK_CACHE_BYTES,
            max_files: DEFAULT_DISK_MAX_FILES,
        }
    }
}

/// Full icon cache configuration.
#[derive(Debug, Clone)]
pub struct IconCacheConfig {
    /// Memory tier budget in bytes of decoded RGBA
    pub memory_bytes: usize,
    /// Disk tier settings; `None` disables the disk tier
    pub disk: Option<DiskIconCacheConfig>,
    /// Size used when a request carries none
    pub default_size_points: u32,
    /// Pixels per point on the target display
    pub device_scale: f32,
    /// Timeout for remote fetches
    pub fetch_timeout: Duration,
    /// Directory bundled asset paths are resolved against
    pub asset_root: PathBuf,
}

impl Default for IconCacheConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_CACHE_BYTES,
            disk: Some(DiskIconCacheConfig::default()),
            default_size_points: DEFAULT_ICON_SIZE_POINTS,
            device_scale: 1.0,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            asset_root: PathBuf::from("."),
        }
    }
}

impl IconCacheConfig {
    /// Memory-only configuration, mostly useful in tests.
    pub fn memory_only() -> Self {
        Self {
            disk: None,
            ..Self::default()
        }
    }

    pub fn with_memory_bytes(mut self, bytes: usize) -> Self {
        self.memory_bytes = bytes;
        self
    }

    pub fn with_disk(mut self, disk: DiskIconCacheConfig) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn with_device_scale(mut self, scale: f32) -> Self {
        self.device_scale = scale;
        self
    }

    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Default directory for cached icons (`<platform cache dir>/mapoverlay/icons`).
pub fn default_icon_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("mapoverlay")
        .join("icons")
}

/// Counters describing icon cache behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconCacheStats {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub disk_hits: u64,
    pub fetches_started: u64,
    pub fetches_coalesced: u64,
    pub failures: u64,
    pub memory_evictions: u64,
    pub memory_bytes: usize,
    pub memory_entries: usize,
}

impl IconCacheStats {
    /// Fraction of resolutions answered from memory.
    pub fn memory_hit_rate(&self) -> f64 {
        let total = self.memory_hits + self.memory_misses;
        if total == 0 {
            0.0
        } else {
            self.memory_hits as f64 / total as f64
        }
    }
}
