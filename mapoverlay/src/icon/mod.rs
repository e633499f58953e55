//! Icon resolution and caching.
//!
//! Icons are requested by `(source, size in points)` and come back as
//! decoded bitmaps scaled down to fit. A bounded memory tier answers
//! repeated requests, a bounded disk tier keeps fetched remote icons across
//! sessions, and remote fetches run on the tokio runtime.

mod bitmap;
mod cache;
mod disk;
mod fetch;
mod key;
mod memory;
mod source;
mod types;

#[cfg(test)]
pub(crate) use bitmap::test_png;

pub use bitmap::{decode_and_fit, max_pixels, Bitmap};
pub use cache::{IconCache, IconCompletion, IconTarget, Resolution};
pub use disk::{DiskIconCache, DiskUsage, PruneResult};
pub use fetch::{BoxFuture, FetchError, IconFetcher, ReqwestFetcher};
pub use key::{djb2, IconKey};
pub use memory::MemoryIconCache;
pub use source::{IconRef, IconSource};
pub use types::{
    default_icon_directory, DiskIconCacheConfig, IconCacheConfig, IconCacheStats, IconError,
    DEFAULT_DISK_CACHE_BYTES, DEFAULT_DISK_MAX_FILES, DEFAULT_FETCH_TIMEOUT,
    DEFAULT_ICON_SIZE_POINTS, DEFAULT_MEMORY_CACHE_BYTES,
};
