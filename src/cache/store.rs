//! Filesystem-based cache store.
//!
//! Stores one JSON file per key in `~/.config/diffsage/cache/`, named by
//! the SHA-256 of the storage key so arbitrary URLs map to safe names.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{CacheEntry, CacheStore};

/// On-disk form; `result: null` marks an in-progress run.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    result: Option<String>,
}

/// Filesystem-based cache store.
pub struct FileStore {
    cache_dir: Option<PathBuf>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    /// Create a new file store using the default cache directory.
    pub fn new() -> Self {
        let cache_dir =
            dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("cache"));
        Self { cache_dir }
    }

    /// Create a file store with a specific cache directory.
    pub fn new_with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir: Some(cache_dir),
        }
    }

    /// Remove all cached entries.
    pub fn clear(&self) -> Result<CacheStats, std::io::Error> {
        let stats = self.stats();
        if let Some(ref dir) = self.cache_dir {
            if dir.exists() {
                std::fs::remove_dir_all(dir)?;
            }
        }
        stats
    }

    /// Compute statistics about the cache.
    pub fn stats(&self) -> Result<CacheStats, std::io::Error> {
        let mut stats = CacheStats {
            entries: 0,
            total_bytes: 0,
        };
        let Some(ref dir) = self.cache_dir else {
            return Ok(stats);
        };
        if !dir.exists() {
            return Ok(stats);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                stats.entries += 1;
                stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok(stats)
    }

    /// Return the cache directory path.
    pub fn path(&self) -> Option<&PathBuf> {
        self.cache_dir.as_ref()
    }

    fn key_path(&self, key: &str) -> Option<PathBuf> {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{digest}.json")))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return None;
        }

        let content = std::fs::read_to_string(&path).ok()?;
        let stored: StoredEntry = match serde_json::from_str(&content) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                return None;
            }
        };
        // Guard against digest collisions.
        if stored.key != key {
            return None;
        }
        Some(match stored.result {
            Some(text) => CacheEntry::Ready(text),
            None => CacheEntry::InProgress,
        })
    }

    fn set(&self, key: &str, entry: &CacheEntry) {
        let Some(path) = self.key_path(key) else {
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(dir = %parent.display(), error = %e, "cannot create cache directory");
                return;
            }
        }

        let stored = StoredEntry {
            key: key.to_string(),
            result: entry.ready_text().map(str::to_string),
        };
        let content = match serde_json::to_string(&stored) {
            Ok(c) => c,
            Err(_) => return,
        };

        if let Err(e) = std::fs::write(&path, content) {
            tracing::warn!(path = %path.display(), error = %e, "cannot write cache entry");
        }
    }

    fn remove(&self, key: &str) {
        let Some(path) = self.key_path(key) else {
            return;
        };
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "cannot remove cache entry");
            }
        }
    }
}

/// Statistics about the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached entries.
    pub entries: usize,
    /// Total size in bytes.
    pub total_bytes: u64,
}

impl CacheStats {
    /// Format total_bytes as a human-readable string.
    pub fn human_size(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = 1024 * KB;

        if self.total_bytes >= MB {
            format!("{:.1} MiB", self.total_bytes as f64 / MB as f64)
        } else if self.total_bytes >= KB {
            format!("{:.1} KiB", self.total_bytes as f64 / KB as f64)
        } else {
            format!("{} B", self.total_bytes)
        }
    }
}
