//! CacheStore trait: the abstract interface for cache persistence.

use async_trait::async_trait;
use camsync_core::Cache;

use crate::error::Result;

/// Durable storage for the delivery cache.
///
/// # Design Notes
///
/// - `load` is infallible: a missing or unreadable cache is an empty cache.
///   The worst outcome is resending every URL once.
/// - `save` must be atomic with respect to `load`: a concurrent crash never
///   leaves a partially written mapping readable.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the persisted mapping.
    async fn load(&self) -> Cache;

    /// Replace the persisted mapping with `cache`.
    async fn save(&self, cache: &Cache) -> Result<()>;
}
