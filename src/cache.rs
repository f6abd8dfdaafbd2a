//! Disk cache for preloaded slide media.
//!
//! Size-capped store with LRU eviction. Entries are keyed by slide id plus
//! a digest of the media URL, so a changed reference never serves a stale
//! file. The directory is rescanned on startup to survive restarts.

use anyhow::{Context, Result};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
struct CacheEntry {
    path: PathBuf,
    size: u64,
}

/// LRU disk cache for media assets.
pub struct MediaCache {
    cache_dir: PathBuf,
    /// Maximum cache size in bytes.
    max_size: u64,
    current_size: u64,
    lru: LruCache<String, CacheEntry>,
}

impl MediaCache {
    /// Create a cache rooted at `cache_dir` with a gigabyte size cap.
    pub fn new(cache_dir: PathBuf, max_size_gb: u64) -> Result<Self> {
        Self::with_capacity(cache_dir, max_size_gb * 1024 * 1024 * 1024)
    }

    /// Create a cache with an explicit byte cap.
    pub fn with_capacity(cache_dir: PathBuf, max_size: u64) -> Result<Self> {
        fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

        let mut cache = Self {
            cache_dir,
            max_size,
            current_size: 0,
            lru: LruCache::new(NonZeroUsize::new(1024).unwrap()),
        };
        cache.scan_existing();

        tracing::info!(
            "Media cache initialized: {} entries, {:.2} MB used",
            cache.lru.len(),
            cache.current_size as f64 / 1024.0 / 1024.0
        );

        Ok(cache)
    }

    /// Rebuild the index from files already on disk.
    fn scan_existing(&mut self) {
        for entry in WalkDir::new(&self.cache_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();
            let Some(key) = path.file_stem().and_then(|n| n.to_str()) else {
                continue;
            };
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            let size = metadata.len();
            self.lru.put(key.to_string(), CacheEntry { path, size });
            self.current_size += size;
        }
    }

    /// Cache key for a media reference: slide id plus URL digest.
    fn cache_key(slide_id: u32, url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        format!("{:04}-{}", slide_id, hex)
    }

    fn cache_path(&self, key: &str, url: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key, extension_for(url)))
    }

    /// Path of the cached copy, if one exists. Promotes the entry.
    pub fn cached_path(&mut self, slide_id: u32, url: &str) -> Option<PathBuf> {
        let key = Self::cache_key(slide_id, url);
        let entry = self.lru.get(&key)?;
        entry.path.exists().then(|| entry.path.clone())
    }

    /// Write downloaded bytes into the cache, evicting as needed.
    pub async fn store(&mut self, slide_id: u32, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        let key = Self::cache_key(slide_id, url);
        let path = self.cache_path(&key, url);
        let size = bytes.len() as u64;

        while self.current_size + size > self.max_size {
            if !self.evict_lru() {
                tracing::warn!("Cache full and nothing left to evict, storing anyway");
                break;
            }
        }

        let mut file = tokio::fs::File::create(&path)
            .await
            .context("Failed to create cache file")?;
        file.write_all(bytes)
            .await
            .context("Failed to write cache file")?;
        file.flush().await.context("Failed to flush cache file")?;

        self.lru.put(
            key,
            CacheEntry {
                path: path.clone(),
                size,
            },
        );
        self.current_size += size;

        tracing::debug!(
            "Cached slide {} media ({:.1} KB), total {:.1} MB",
            slide_id,
            size as f64 / 1024.0,
            self.current_size as f64 / 1024.0 / 1024.0
        );

        Ok(path)
    }

    /// Drop the least recently used entry. Returns false when empty.
    fn evict_lru(&mut self) -> bool {
        let Some((_, entry)) = self.lru.pop_lru() else {
            return false;
        };
        tracing::debug!("Evicting {:?}", entry.path);
        if entry.path.exists() {
            if let Err(e) = fs::remove_file(&entry.path) {
                tracing::warn!("Failed to remove cached file: {}", e);
            }
        }
        self.current_size = self.current_size.saturating_sub(entry.size);
        true
    }

    pub fn entry_count(&self) -> usize {
        self.lru.len()
    }
}

/// File extension for a cached copy, taken from the URL path.
fn extension_for(url: &str) -> &str {
    Path::new(url)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("mp4")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_lookup() {
        let dir = TempDir::new().unwrap();
        let mut cache = MediaCache::with_capacity(dir.path().to_path_buf(), 1024).unwrap();

        let url = "https://example.com/clips/intro.mp4";
        let path = cache.store(1, url, b"frames").await.unwrap();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "mp4");

        assert_eq!(cache.cached_path(1, url), Some(path));
        // Different URL for the same slide misses.
        assert_eq!(cache.cached_path(1, "https://example.com/other.mp4"), None);
    }

    #[tokio::test]
    async fn test_rescan_recovers_entries() {
        let dir = TempDir::new().unwrap();
        let url = "https://example.com/clips/intro.mp4";
        {
            let mut cache =
                MediaCache::with_capacity(dir.path().to_path_buf(), 1024).unwrap();
            cache.store(2, url, b"frames").await.unwrap();
        }

        let mut reopened =
            MediaCache::with_capacity(dir.path().to_path_buf(), 1024).unwrap();
        assert_eq!(reopened.entry_count(), 1);
        assert!(reopened.cached_path(2, url).is_some());
    }

    #[tokio::test]
    async fn test_eviction_respects_size_cap() {
        let dir = TempDir::new().unwrap();
        let mut cache = MediaCache::with_capacity(dir.path().to_path_buf(), 10).unwrap();

        let first = "https://example.com/a.mp4";
        let second = "https://example.com/b.mp4";
        cache.store(1, first, b"12345678").await.unwrap();
        cache.store(2, second, b"12345678").await.unwrap();

        // The first entry had to go to make room.
        assert_eq!(cache.cached_path(1, first), None);
        assert!(cache.cached_path(2, second).is_some());
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn test_extension_fallback() {
        assert_eq!(extension_for("https://example.com/a.webm"), "webm");
        assert_eq!(extension_for("https://example.com/stream"), "mp4");
        assert_eq!(extension_for(""), "mp4");
    }
}
