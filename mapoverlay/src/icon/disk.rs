//! Persistent icon tier: a flat directory of `<hash>.png` files.
//!
//! There is no index. Recency is approximated by file modification time and
//! budgets are enforced by a prune pass after every successful write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

use super::key::IconKey;
use super::types::{DiskIconCacheConfig, IconError};

const ICON_EXTENSION: &str = "png";
const TEMP_EXTENSION: &str = "tmp";

/// Result of a prune or clear pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneResult {
    /// Number of files deleted
    pub files_deleted: usize,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Files remaining after the pass
    pub files_remaining: usize,
    /// Bytes remaining after the pass
    pub bytes_remaining: u64,
}

/// Usage of the disk tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiskUsage {
    pub files: usize,
    pub bytes: u64,
}

/// Disk tier of the icon cache.
///
/// Cheap to clone; clones share the prune lock so passes never overlap.
#[derive(Debug, Clone)]
pub struct DiskIconCache {
    directory: PathBuf,
    max_bytes: u64,
    max_files: usize,
    prune_lock: Arc<Mutex<()>>,
}

struct CachedFile {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

impl DiskIconCache {
    pub fn new(config: DiskIconCacheConfig) -> Self {
        Self {
            directory: config.directory,
            max_bytes: config.max_bytes,
            max_files: config.max_files,
            prune_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn path_for(&self, key: &IconKey) -> PathBuf {
        self.directory.join(key.disk_filename())
    }

    /// Reads the encoded bytes stored for `key`.
    ///
    /// Missing files are a plain miss; other I/O errors are logged and also
    /// reported as a miss.
    pub fn read(&self, key: &IconKey) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read cached icon");
                None
            }
        }
    }

    /// Writes `data` for `key` atomically (temp file, then rename).
    pub fn write(&self, key: &IconKey, data: &[u8]) -> Result<(), IconError> {
        fs::create_dir_all(&self.directory)?;
        let path = self.path_for(key);
        let temp_path = path.with_extension(TEMP_EXTENSION);
        fs::write(&temp_path, data)?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        debug!(key = %key, path = %path.display(), bytes = data.len(), "Icon written to disk cache");
        Ok(())
    }

    /// Deletes least-recently-modified files until both budgets hold.
    pub fn prune(&self) -> Result<PruneResult, IconError> {
        let _guard = self
            .prune_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = Instant::now();

        let mut files = self.collect_files()?;
        files.sort_by_key(|f| f.modified);

        let mut bytes: u64 = files.iter().map(|f| f.size).sum();
        let mut count = files.len();
        let mut result = PruneResult::default();

        for file in files {
            if bytes <= self.max_bytes && count <= self.max_files {
                break;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    result.files_deleted += 1;
                    result.bytes_freed += file.size;
                }
                // Already gone counts toward the budget all the same
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Failed to prune cached icon");
                    continue;
                }
            }
            bytes -= file.size;
            count -= 1;
        }

        result.files_remaining = count;
        result.bytes_remaining = bytes;

        if result.files_deleted > 0 {
            info!(
                files_deleted = result.files_deleted,
                bytes_freed = result.bytes_freed,
                files_remaining = count,
                bytes_remaining = bytes,
                duration_ms = start.elapsed().as_millis() as u64,
                "Pruned icon disk cache"
            );
        }

        Ok(result)
    }

    /// Current file count and total size.
    pub fn usage(&self) -> Result<DiskUsage, IconError> {
        let files = self.collect_files()?;
        Ok(DiskUsage {
            files: files.len(),
            bytes: files.iter().map(|f| f.size).sum(),
        })
    }

    /// Deletes every cached icon.
    pub fn clear(&self) -> Result<PruneResult, IconError> {
        let _guard = self
            .prune_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut result = PruneResult::default();
        for file in self.collect_files()? {
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    result.files_deleted += 1;
                    result.bytes_freed += file.size;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(result)
    }

    fn collect_files(&self) -> Result<Vec<CachedFile>, IconError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != ICON_EXTENSION) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            files.push(CachedFile {
                path,
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                size: metadata.len(),
            });
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::source::IconSource;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn cache(dir: &TempDir, max_bytes: u64, max_files: usize) -> DiskIconCache {
        DiskIconCache::new(DiskIconCacheConfig {
            directory: dir.path().to_path_buf(),
            max_bytes,
            max_files,
        })
    }

    fn key(name: &str) -> IconKey {
        IconKey::new(&IconSource::Remote(format!("https://x/{}", name)), 48)
    }

    fn age(cache: &DiskIconCache, key: &IconKey, seconds_ago: i64) {
        let now = FileTime::now().unix_seconds();
        filetime::set_file_mtime(
            cache.path_for(key),
            FileTime::from_unix_time(now - seconds_ago, 0),
        )
        .unwrap();
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 1024, 10);
        cache.write(&key("a"), b"hello").unwrap();
        assert_eq!(cache.read(&key("a")).unwrap(), b"hello");
        assert!(cache.read(&key("missing")).is_none());
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 1024, 10);
        cache.write(&key("a"), b"hello").unwrap();
        let temp_files = fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(temp_files, 0);
    }

    #[test]
    fn test_prune_by_file_count_removes_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 1024 * 1024, 2);
        for (name, age_secs) in [("a", 300), ("b", 200), ("c", 100)] {
            cache.write(&key(name), b"data").unwrap();
            age(&cache, &key(name), age_secs);
        }

        let result = cache.prune().unwrap();
        assert_eq!(result.files_deleted, 1);
        assert_eq!(result.files_remaining, 2);
        assert!(cache.read(&key("a")).is_none());
        assert!(cache.read(&key("b")).is_some());
        assert!(cache.read(&key("c")).is_some());
    }

    #[test]
    fn test_prune_by_bytes() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 250, 100);
        for (name, age_secs) in [("a", 300), ("b", 200), ("c", 100)] {
            cache.write(&key(name), &[0u8; 100]).unwrap();
            age(&cache, &key(name), age_secs);
        }

        let result = cache.prune().unwrap();
        assert_eq!(result.files_deleted, 1);
        assert_eq!(result.bytes_freed, 100);

        let usage = cache.usage().unwrap();
        assert!(usage.bytes <= 250);
        assert_eq!(usage.files, 2);
    }

    #[test]
    fn test_prune_within_budget_is_noop() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 1024, 10);
        cache.write(&key("a"), b"data").unwrap();
        assert_eq!(cache.prune().unwrap().files_deleted, 0);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let cache = DiskIconCache::new(DiskIconCacheConfig {
            directory: dir.path().join("never-created"),
            max_bytes: 10,
            max_files: 1,
        });
        assert_eq!(cache.usage().unwrap(), DiskUsage::default());
        assert_eq!(cache.prune().unwrap(), PruneResult::default());
    }

    #[test]
    fn test_clear_ignores_foreign_files() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 1024, 10);
        cache.write(&key("a"), b"data").unwrap();
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        let result = cache.clear().unwrap();
        assert_eq!(result.files_deleted, 1);
        assert!(dir.path().join("notes.txt").exists());
    }
}
