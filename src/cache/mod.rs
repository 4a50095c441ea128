//! Review result cache keyed by change and model.
//!
//! A key moves through three observable states: absent, in progress
//! (a run has started but not finished) and ready. Values are only ever
//! overwritten whole; there is no partial update.

pub mod memory;
pub mod store;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use memory::MemoryStore;
pub use store::{CacheStats, FileStore};

/// Identifies one review: a change reviewed by one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub change_id: String,
    pub model: String,
}

impl CacheKey {
    pub fn new(change_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            change_id: change_id.into(),
            model: model.into(),
        }
    }

    /// The `"{change_id}|{model}"` form used by storage backends.
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.change_id, self.model)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.change_id, self.model)
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// A run for this key has started and not yet finished.
    InProgress,
    Ready(String),
}

impl CacheEntry {
    pub fn ready_text(&self) -> Option<&str> {
        match self {
            CacheEntry::Ready(text) => Some(text),
            CacheEntry::InProgress => None,
        }
    }
}

/// Storage backend for [`ResultCache`].
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, entry: &CacheEntry);
    fn remove(&self, key: &str);
}

/// The cache used by the orchestrator.
#[derive(Clone)]
pub struct ResultCache {
    enabled: bool,
    store: Arc<dyn CacheStore>,
}

impl ResultCache {
    pub fn new(enabled: bool, store: Arc<dyn CacheStore>) -> Self {
        Self { enabled, store }
    }

    /// An enabled, session-scoped in-memory cache.
    pub fn in_memory() -> Self {
        Self::new(true, Arc::new(MemoryStore::default()))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.enabled {
            return None;
        }
        self.store.get(&key.storage_key())
    }

    /// Overwrite the value for `key`.
    pub fn set(&self, key: &CacheKey, entry: CacheEntry) {
        if !self.enabled {
            return;
        }
        self.store.set(&key.storage_key(), &entry);
    }

    pub fn invalidate(&self, key: &CacheKey) {
        if !self.enabled {
            return;
        }
        self.store.remove(&key.storage_key());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_joins_with_pipe() {
        let key = CacheKey::new("https://git.example.com/pr/1.diff", "llama3.1");
        assert_eq!(key.storage_key(), "https://git.example.com/pr/1.diff|llama3.1");
        assert_eq!(key.to_string(), key.storage_key());
    }

    #[test]
    fn keys_differ_per_model() {
        let cache = ResultCache::in_memory();
        let a = CacheKey::new("d", "m1");
        let b = CacheKey::new("d", "m2");
        cache.set(&a, CacheEntry::Ready("one".into()));
        assert_eq!(cache.get(&a), Some(CacheEntry::Ready("one".into())));
        assert_eq!(cache.get(&b), None);
    }

    #[test]
    fn set_overwrites_in_progress() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("d", "m");
        cache.set(&key, CacheEntry::InProgress);
        assert_eq!(cache.get(&key), Some(CacheEntry::InProgress));
        cache.set(&key, CacheEntry::Ready("done".into()));
        assert_eq!(cache.get(&key).unwrap().ready_text(), Some("done"));
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ResultCache::in_memory();
        let key = CacheKey::new("d", "m");
        cache.set(&key, CacheEntry::Ready("x".into()));
        cache.invalidate(&key);
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn disabled_cache_never_stores() {
        let cache = ResultCache::new(false, Arc::new(MemoryStore::default()));
        let key = CacheKey::new("d", "m");
        cache.set(&key, CacheEntry::Ready("x".into()));
        assert_eq!(cache.get(&key), None);
        assert!(!cache.is_enabled());
    }
}
