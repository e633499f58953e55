//! Icon resolution across the memory tier, the disk tier and the network.
//!
//! # Resolution order
//!
//! ```text
//! resolve(icon, target)
//!   ├─ memory hit ───────────────────────────────► Ready
//!   ├─ inline / asset ── decode + fit ── memory ──► Ready | Unavailable
//!   └─ remote
//!        ├─ disk hit ── decode + fit ── memory ───► Ready
//!        ├─ fetch already in flight ── add waiter ► Pending
//!        └─ spawn fetch ──────────────────────────► Pending
//!                 │
//!                 ▼  (runtime)
//!           fetch ─► decode + fit ─► disk write ─► prune
//!                 │
//!                 ▼
//!           completion channel ─► take_completions() on the owner
//! ```
//!
//! Only the owner touches the memory tier and the waiter table. Background
//! tasks communicate exclusively through the completion channel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::bitmap::{decode_and_fit, Bitmap};
use super::disk::DiskIconCache;
use super::fetch::{IconFetcher, ReqwestFetcher};
use super::key::IconKey;
use super::memory::MemoryIconCache;
use super::source::{IconRef, IconSource};
use super::types::{IconCacheConfig, IconCacheStats, IconError};

/// Who is waiting for an icon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IconTarget {
    /// A marker, by id
    Marker(String),
    /// A rendered cluster, by cluster key
    Cluster(String),
}

/// Outcome of a synchronous resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Bitmap available now
    Ready(Bitmap),
    /// A fetch is running; the target will be named in a later completion
    Pending,
    /// Resolution failed; the target keeps its default appearance
    Unavailable,
}

/// A finished background fetch, drained by the owner.
#[derive(Debug, Clone)]
pub struct IconCompletion {
    pub key: IconKey,
    /// Every target that asked for `key` while the fetch was in flight
    pub targets: Vec<IconTarget>,
    /// `None` when the fetch or decode failed
    pub bitmap: Option<Bitmap>,
}

struct FetchOutcome {
    key: IconKey,
    result: Result<Bitmap, IconError>,
}

/// Two-tier icon cache with asynchronous remote fetching.
pub struct IconCache {
    config: IconCacheConfig,
    memory: MemoryIconCache,
    disk: Option<DiskIconCache>,
    fetcher: Arc<dyn IconFetcher>,
    runtime: Option<Handle>,
    in_flight: HashMap<IconKey, Vec<IconTarget>>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
    cancellation: CancellationToken,
    stats: IconCacheStats,
}

impl IconCache {
    /// Creates a cache that fetches remote icons over HTTP.
    ///
    /// Captures the current tokio runtime if there is one; without a runtime
    /// remote icons resolve to [`Resolution::Unavailable`].
    pub fn new(config: IconCacheConfig) -> Result<Self, IconError> {
        let fetcher = ReqwestFetcher::new(config.fetch_timeout)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates a cache with a custom fetcher.
    pub fn with_fetcher(config: IconCacheConfig, fetcher: Arc<dyn IconFetcher>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            memory: MemoryIconCache::new(config.memory_bytes),
            disk: config.disk.clone().map(DiskIconCache::new),
            config,
            fetcher,
            runtime: Handle::try_current().ok(),
            in_flight: HashMap::new(),
            outcome_tx,
            outcome_rx,
            cancellation: CancellationToken::new(),
            stats: IconCacheStats::default(),
        }
    }

    /// Runs background fetches on `runtime` instead of the ambient one.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(&self) -> &IconCacheConfig {
        &self.config
    }

    pub fn disk(&self) -> Option<&DiskIconCache> {
        self.disk.as_ref()
    }

    /// Resolves `icon` for `target` without blocking on the network.
    pub fn resolve(&mut self, icon: &IconRef, target: IconTarget) -> Resolution {
        let key = icon.key();

        if let Some(bitmap) = self.memory.get(&key) {
            self.stats.memory_hits += 1;
            debug!(key = %key, "Icon memory hit");
            return Resolution::Ready(bitmap);
        }
        self.stats.memory_misses += 1;

        match &icon.source {
            IconSource::Inline(bytes) => self.decode_into_memory(key, bytes, icon.size_points),
            IconSource::Asset(path) => {
                let full_path = IconSource::asset_path(path, &self.config.asset_root);
                match std::fs::read(&full_path) {
                    Ok(bytes) => self.decode_into_memory(key, &bytes, icon.size_points),
                    Err(e) => {
                        let err = if e.kind() == std::io::ErrorKind::NotFound {
                            IconError::AssetNotFound(full_path)
                        } else {
                            IconError::Io(e)
                        };
                        self.record_failure(&key, &err);
                        Resolution::Unavailable
                    }
                }
            }
            IconSource::Remote(url) => {
                if let Some(bitmap) = self.load_from_disk(&key, icon.size_points) {
                    return Resolution::Ready(bitmap);
                }
                self.start_fetch(key, url, icon.size_points, target)
            }
        }
    }

    /// Drains every finished fetch without waiting.
    pub fn take_completions(&mut self) -> Vec<IconCompletion> {
        let mut completions = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            completions.push(self.complete(outcome));
        }
        completions
    }

    /// Waits for the next finished fetch.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<IconCompletion> {
        if self.in_flight.is_empty() {
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        Some(self.complete(outcome))
    }

    /// Number of distinct keys currently being fetched.
    pub fn pending_fetches(&self) -> usize {
        self.in_flight.len()
    }

    /// Drops the memory tier. Disk entries are kept.
    pub fn on_memory_pressure(&mut self) {
        debug!(
            entries = self.memory.len(),
            bytes = self.memory.size_bytes(),
            "Clearing icon memory cache on memory pressure"
        );
        self.memory.clear();
    }

    /// Cancels every in-flight fetch and forgets their waiters.
    pub fn cancel_all(&mut self) {
        self.cancellation.cancel();
        self.cancellation = CancellationToken::new();
        self.in_flight.clear();
    }

    pub fn stats(&self) -> IconCacheStats {
        IconCacheStats {
            memory_evictions: self.memory.evictions(),
            memory_bytes: self.memory.size_bytes(),
            memory_entries: self.memory.len(),
            ..self.stats.clone()
        }
    }

    fn decode_into_memory(&mut self, key: IconKey, bytes: &[u8], size_points: u32) -> Resolution {
        match decode_and_fit(bytes, size_points, self.config.device_scale) {
            Ok(bitmap) => {
                self.memory.put(key, bitmap.clone());
                Resolution::Ready(bitmap)
            }
            Err(e) => {
                self.record_failure(&key, &e);
                Resolution::Unavailable
            }
        }
    }

    fn load_from_disk(&mut self, key: &IconKey, size_points: u32) -> Option<Bitmap> {
        let bytes = self.disk.as_ref()?.read(key)?;
        match decode_and_fit(&bytes, size_points, self.config.device_scale) {
            Ok(bitmap) => {
                self.stats.disk_hits += 1;
                debug!(key = %key, "Icon disk hit, promoted to memory");
                self.memory.put(key.clone(), bitmap.clone());
                Some(bitmap)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached icon on disk is unreadable");
                None
            }
        }
    }

    fn start_fetch(
        &mut self,
        key: IconKey,
        url: &str,
        size_points: u32,
        target: IconTarget,
    ) -> Resolution {
        if let Some(waiters) = self.in_flight.get_mut(&key) {
            if !waiters.contains(&target) {
                waiters.push(target);
            }
            self.stats.fetches_coalesced += 1;
            debug!(key = %key, waiters = waiters.len(), "Joined in-flight icon fetch");
            return Resolution::Pending;
        }

        let Some(runtime) = self.runtime.clone() else {
            warn!(key = %key, "No async runtime available, remote icon skipped");
            self.stats.failures += 1;
            return Resolution::Unavailable;
        };

        self.in_flight.insert(key.clone(), vec![target]);
        self.stats.fetches_started += 1;
        debug!(key = %key, url = url, "Starting icon fetch");

        let task = FetchTask {
            key,
            url: url.to_string(),
            size_points,
            device_scale: self.config.device_scale,
            fetcher: Arc::clone(&self.fetcher),
            disk: self.disk.clone(),
            cancellation: self.cancellation.clone(),
            outcome_tx: self.outcome_tx.clone(),
        };
        runtime.spawn(task.run());

        Resolution::Pending
    }

    fn complete(&mut self, outcome: FetchOutcome) -> IconCompletion {
        let targets = self.in_flight.remove(&outcome.key).unwrap_or_default();
        let bitmap = match outcome.result {
            Ok(bitmap) => {
                self.memory.put(outcome.key.clone(), bitmap.clone());
                Some(bitmap)
            }
            Err(e) => {
                self.record_failure(&outcome.key, &e);
                None
            }
        };
        IconCompletion {
            key: outcome.key,
            targets,
            bitmap,
        }
    }

    fn record_failure(&mut self, key: &IconKey, error: &IconError) {
        self.stats.failures += 1;
        warn!(key = %key, error = %error, "Icon unavailable, keeping default appearance");
    }
}

/// Everything a background fetch needs, moved onto the runtime.
struct FetchTask {
    key: IconKey,
    url: String,
    size_points: u32,
    device_scale: f32,
    fetcher: Arc<dyn IconFetcher>,
    disk: Option<DiskIconCache>,
    cancellation: CancellationToken,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
}

impl FetchTask {
    async fn run(self) {
        let fetched = tokio::select! {
            _ = self.cancellation.cancelled() => {
                debug!(key = %self.key, "Icon fetch cancelled");
                return;
            }
            result = self.fetcher.fetch(&self.url) => result,
        };

        let result = match fetched {
            Ok(bytes) => {
                let key = self.key.clone();
                let disk = self.disk;
                let (size_points, device_scale) = (self.size_points, self.device_scale);
                tokio::task::spawn_blocking(move || -> Result<Bitmap, IconError> {
                    let bitmap = decode_and_fit(&bytes, size_points, device_scale)?;
                    if let Some(disk) = disk {
                        store_on_disk(&disk, &key, &bitmap);
                    }
                    Ok(bitmap)
                })
                .await
                .unwrap_or_else(|e| Err(IconError::Decode(format!("decode task failed: {}", e))))
            }
            Err(e) => Err(e.into()),
        };

        // The receiver lives as long as the cache; a closed channel means the
        // cache was dropped and nobody wants the result.
        let _ = self.outcome_tx.send(FetchOutcome {
            key: self.key,
            result,
        });
    }
}

fn store_on_disk(disk: &DiskIconCache, key: &IconKey, bitmap: &Bitmap) {
    let written = bitmap.encode_png().and_then(|png| disk.write(key, &png));
    if let Err(e) = written {
        warn!(key = %key, error = %e, "Failed to write icon to disk cache");
        return;
    }
    if let Err(e) = disk.prune() {
        warn!(error = %e, "Failed to prune icon disk cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::bitmap::test_png;
    use crate::icon::fetch::{BoxFuture, FetchError};
    use crate::icon::types::DiskIconCacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingFetcher {
        calls: AtomicUsize,
        body: Result<Vec<u8>, FetchError>,
    }

    impl CountingFetcher {
        fn ok(body: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                body: Ok(body),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                body: Err(FetchError::Status {
                    url: "https://x/missing.png".into(),
                    status: 404,
                }),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl IconFetcher for CountingFetcher {
        fn fetch<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Vec<u8>, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self.body.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                body
            })
        }
    }

    fn disk_config(dir: &TempDir) -> IconCacheConfig {
        IconCacheConfig::memory_only().with_disk(DiskIconCacheConfig {
            directory: dir.path().to_path_buf(),
            max_bytes: 1024 * 1024,
            max_files: 100,
        })
    }

    fn remote(url: &str) -> IconRef {
        IconRef::new(IconSource::Remote(url.to_string()), 48)
    }

    fn marker(id: &str) -> IconTarget {
        IconTarget::Marker(id.to_string())
    }

    #[tokio::test]
    async fn test_inline_resolves_synchronously() {
        let mut cache =
            IconCache::with_fetcher(IconCacheConfig::memory_only(), CountingFetcher::ok(vec![]));
        let icon = IconRef::new(IconSource::inline(test_png(100, 100)), 48);

        let Resolution::Ready(bitmap) = cache.resolve(&icon, marker("m1")) else {
            panic!("inline icon should be ready");
        };
        assert_eq!(bitmap.longest_side(), 48);

        assert!(matches!(
            cache.resolve(&icon, marker("m1")),
            Resolution::Ready(_)
        ));
        assert_eq!(cache.stats().memory_hits, 1);
    }

    #[tokio::test]
    async fn test_invalid_inline_is_unavailable() {
        let mut cache =
            IconCache::with_fetcher(IconCacheConfig::memory_only(), CountingFetcher::ok(vec![]));
        let icon = IconRef::new(IconSource::inline(b"garbage".to_vec()), 48);
        assert_eq!(cache.resolve(&icon, marker("m1")), Resolution::Unavailable);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_asset_resolves_from_root() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pin.png"), test_png(20, 20)).unwrap();
        let config = IconCacheConfig::memory_only().with_asset_root(dir.path());
        let mut cache = IconCache::with_fetcher(config, CountingFetcher::ok(vec![]));

        let found = IconRef::new(IconSource::Asset("pin.png".into()), 48);
        let missing = IconRef::new(IconSource::Asset("nope.png".into()), 48);
        assert!(matches!(
            cache.resolve(&found, marker("a")),
            Resolution::Ready(_)
        ));
        assert_eq!(cache.resolve(&missing, marker("b")), Resolution::Unavailable);
    }

    #[tokio::test]
    async fn test_remote_fetch_completes_and_promotes() {
        let dir = TempDir::new().unwrap();
        let fetcher = CountingFetcher::ok(test_png(64, 64));
        let mut cache = IconCache::with_fetcher(disk_config(&dir), fetcher.clone());
        let icon = remote("https://x/a.png");

        assert_eq!(cache.resolve(&icon, marker("m1")), Resolution::Pending);
        let completion = cache.next_completion().await.unwrap();
        assert_eq!(completion.targets, vec![marker("m1")]);
        assert_eq!(completion.bitmap.unwrap().longest_side(), 48);

        assert!(matches!(
            cache.resolve(&icon, marker("m1")),
            Resolution::Ready(_)
        ));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let fetcher = CountingFetcher::ok(test_png(10, 10));
        let mut cache = IconCache::with_fetcher(IconCacheConfig::memory_only(), fetcher.clone());
        let icon = remote("https://x/shared.png");

        assert_eq!(cache.resolve(&icon, marker("a")), Resolution::Pending);
        assert_eq!(cache.resolve(&icon, marker("b")), Resolution::Pending);
        assert_eq!(cache.pending_fetches(), 1);

        let completion = cache.next_completion().await.unwrap();
        assert_eq!(completion.targets, vec![marker("a"), marker("b")]);
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.stats().fetches_coalesced, 1);
    }

    #[tokio::test]
    async fn test_disk_hit_after_memory_pressure_skips_network() {
        let dir = TempDir::new().unwrap();
        let fetcher = CountingFetcher::ok(test_png(64, 64));
        let mut cache = IconCache::with_fetcher(disk_config(&dir), fetcher.clone());
        let icon = remote("https://x/b.png");

        cache.resolve(&icon, marker("m1"));
        cache.next_completion().await.unwrap();
        cache.on_memory_pressure();

        assert!(matches!(
            cache.resolve(&icon, marker("m1")),
            Resolution::Ready(_)
        ));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.stats().disk_hits, 1);
    }

    #[tokio::test]
    async fn test_disk_budget_holds_after_every_fetch() {
        let dir = TempDir::new().unwrap();
        let config = IconCacheConfig::memory_only().with_disk(DiskIconCacheConfig {
            directory: dir.path().to_path_buf(),
            max_bytes: 1024 * 1024,
            max_files: 3,
        });
        let fetcher = CountingFetcher::ok(test_png(64, 64));
        let mut cache = IconCache::with_fetcher(config, fetcher.clone());

        for i in 0..8 {
            let icon = remote(&format!("https://x/{}.png", i));
            assert_eq!(cache.resolve(&icon, marker("m1")), Resolution::Pending);
            assert!(cache.next_completion().await.unwrap().bitmap.is_some());

            let usage = cache.disk().unwrap().usage().unwrap();
            assert!(usage.files <= 3, "{} files after fetch {}", usage.files, i);
            assert!(usage.bytes <= 1024 * 1024);
        }
        assert_eq!(fetcher.calls(), 8);
    }

    #[tokio::test]
    async fn test_failed_fetch_reports_no_bitmap() {
        let mut cache =
            IconCache::with_fetcher(IconCacheConfig::memory_only(), CountingFetcher::failing());
        assert_eq!(
            cache.resolve(&remote("https://x/missing.png"), marker("m1")),
            Resolution::Pending
        );
        let completion = cache.next_completion().await.unwrap();
        assert!(completion.bitmap.is_none());
        assert_eq!(completion.targets, vec![marker("m1")]);
        assert_eq!(cache.pending_fetches(), 0);
    }

    #[test]
    fn test_remote_without_runtime_is_unavailable() {
        let mut cache =
            IconCache::with_fetcher(IconCacheConfig::memory_only(), CountingFetcher::ok(vec![]));
        assert_eq!(
            cache.resolve(&remote("https://x/a.png"), marker("m1")),
            Resolution::Unavailable
        );
    }

    #[tokio::test]
    async fn test_cancel_all_forgets_waiters() {
        let fetcher = CountingFetcher::ok(test_png(10, 10));
        let mut cache = IconCache::with_fetcher(IconCacheConfig::memory_only(), fetcher);
        cache.resolve(&remote("https://x/c.png"), marker("m1"));
        cache.cancel_all();
        assert_eq!(cache.pending_fetches(), 0);
        assert!(cache.next_completion().await.is_none());
    }
}
