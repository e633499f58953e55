//! In-memory icon tier with byte-budget LRU eviction.

use std::collections::HashMap;
use tracing::debug;

use super::bitmap::Bitmap;
use super::key::IconKey;

#[derive(Debug)]
struct MemoryEntry {
    bitmap: Bitmap,
    /// Logical clock value of the last access
    last_accessed: u64,
}

/// Decoded icons keyed by `(source, size)`.
///
/// Owned by the engine's context, so no locking is needed. Recency is a
/// logical clock rather than wall time so ties never occur.
#[derive(Debug)]
pub struct MemoryIconCache {
    entries: HashMap<IconKey, MemoryEntry>,
    max_bytes: usize,
    current_bytes: usize,
    clock: u64,
    evictions: u64,
}

impl MemoryIconCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_bytes,
            current_bytes: 0,
            clock: 0,
            evictions: 0,
        }
    }

    /// Returns the bitmap for `key` and marks it most recently used.
    pub fn get(&mut self, key: &IconKey) -> Option<Bitmap> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(key).map(|entry| {
            entry.last_accessed = clock;
            entry.bitmap.clone()
        })
    }

    /// Inserts a bitmap, evicting least recently used entries to make room.
    ///
    /// Returns `false` when the bitmap alone exceeds the budget; such
    /// bitmaps are not stored.
    pub fn put(&mut self, key: IconKey, bitmap: Bitmap) -> bool {
        let size = bitmap.byte_size();
        if size > self.max_bytes {
            debug!(
                key = %key,
                size_bytes = size,
                max_bytes = self.max_bytes,
                "Icon larger than memory budget, not cached"
            );
            return false;
        }

        if let Some(old) = self.entries.remove(&key) {
            self.current_bytes -= old.bitmap.byte_size();
        }

        self.evict_until_fits(size);

        self.clock += 1;
        self.entries.insert(
            key,
            MemoryEntry {
                bitmap,
                last_accessed: self.clock,
            },
        );
        self.current_bytes += size;
        true
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &IconKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Drops every entry. Called on memory pressure.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_bytes = 0;
    }

    fn evict_until_fits(&mut self, incoming: usize) {
        if self.current_bytes + incoming <= self.max_bytes {
            return;
        }

        let mut by_age: Vec<(IconKey, u64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.last_accessed))
            .collect();
        by_age.sort_by_key(|(_, accessed)| *accessed);

        let mut evicted = 0;
        for (key, _) in by_age {
            if self.current_bytes + incoming <= self.max_bytes {
                break;
            }
            if let Some(entry) = self.entries.remove(&key) {
                self.current_bytes -= entry.bitmap.byte_size();
                evicted += 1;
            }
        }

        self.evictions += evicted;
        debug!(
            evicted = evicted,
            size_bytes = self.current_bytes,
            "Evicted icons from memory cache"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::source::IconSource;
    use image::RgbaImage;

    fn key(name: &str) -> IconKey {
        IconKey::new(&IconSource::Remote(format!("https://x/{}", name)), 48)
    }

    // 10x10 RGBA = 400 bytes
    fn bitmap() -> Bitmap {
        Bitmap::from_rgba(RgbaImage::new(10, 10))
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = MemoryIconCache::new(1000);
        assert!(cache.put(key("a"), bitmap()));
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("b")).is_none());
        assert_eq!(cache.size_bytes(), 400);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = MemoryIconCache::new(1000);
        cache.put(key("a"), bitmap());
        cache.put(key("b"), bitmap());
        // Touch "a" so "b" becomes the oldest
        cache.get(&key("a"));
        cache.put(key("c"), bitmap());

        assert!(cache.contains(&key("a")));
        assert!(!cache.contains(&key("b")));
        assert!(cache.contains(&key("c")));
        assert_eq!(cache.size_bytes(), 800);
        assert_eq!(cache.evictions(), 1);
    }

    #[test]
    fn test_oversized_not_stored() {
        let mut cache = MemoryIconCache::new(100);
        assert!(!cache.put(key("a"), bitmap()));
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_replace_same_key_accounts_once() {
        let mut cache = MemoryIconCache::new(1000);
        cache.put(key("a"), bitmap());
        cache.put(key("a"), bitmap());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.size_bytes(), 400);
    }

    #[test]
    fn test_clear() {
        let mut cache = MemoryIconCache::new(1000);
        cache.put(key("a"), bitmap());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size_bytes(), 0);
    }
}
