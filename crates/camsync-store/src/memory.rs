//! In-memory implementation of the CacheStore trait.
//!
//! This is primarily for testing. Saves are counted and can be made to fail,
//! so the sync loop's persistence rules can be asserted without a filesystem.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use camsync_core::Cache;

use crate::error::{Result, StoreError};
use crate::traits::CacheStore;

/// In-memory store. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    cache: RwLock<Cache>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `cache`.
    pub fn with_cache(cache: Cache) -> Self {
        Self {
            cache: RwLock::new(cache),
            ..Self::default()
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Current persisted contents.
    pub fn persisted(&self) -> Cache {
        self.cache.read().unwrap().clone()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn load(&self) -> Cache {
        self.persisted()
    }

    async fn save(&self, cache: &Cache) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected save failure".into()));
        }
        *self.cache.write().unwrap() = cache.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_counts_saves() {
        let store = MemoryStore::new();
        let mut cache = Cache::new();
        cache.insert("a".into(), "1".into());

        store.save(&cache).await.unwrap();
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load().await, cache);
    }

    #[tokio::test]
    async fn test_memory_store_injected_failure() {
        let store = MemoryStore::new();
        store.set_fail_saves(true);

        let mut cache = Cache::new();
        cache.insert("a".into(), "1".into());

        assert!(store.save(&cache).await.is_err());
        assert_eq!(store.save_count(), 0);
        assert!(store.load().await.is_empty());
    }
}
