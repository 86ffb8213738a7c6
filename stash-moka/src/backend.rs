//! Moka backend implementation.

use async_trait::async_trait;
use moka::future::Cache;
use smol_str::SmolStr;
use stash_backend::{Backend, BackendResult, CacheBackend, DeleteStatus, ValueFormat};
use stash_core::{CacheKey, CacheValue, Raw};

/// In-memory cache backend powered by Moka.
///
/// Reads are lock-free; writes use fine-grained locking. Entries leave the
/// cache when capacity is exceeded or when the expiry recorded in their
/// [`CacheValue`] is reached, whichever comes first.
///
/// # Caveats
///
/// - Data is **not persisted**: the cache is lost on process restart.
/// - Data is **not shared** across processes.
/// - Eviction bookkeeping runs lazily; an expired entry is never returned,
///   but may still count towards capacity until maintenance runs.
#[derive(Clone)]
pub struct MokaBackend {
    pub(crate) cache: Cache<CacheKey, CacheValue<Raw>>,
    pub(crate) name: SmolStr,
    pub(crate) format: ValueFormat,
}

impl std::fmt::Debug for MokaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaBackend")
            .field("name", &self.name)
            .field("entries", &self.cache.entry_count())
            .field("format", &self.format)
            .finish()
    }
}

impl MokaBackend {
    /// Creates a new builder. A capacity must be set before `build()`.
    pub fn builder() -> crate::builder::MokaBackendBuilder<crate::builder::NoCapacity> {
        crate::builder::MokaBackendBuilder::new()
    }

    /// The underlying Moka cache.
    pub fn cache(&self) -> &Cache<CacheKey, CacheValue<Raw>> {
        &self.cache
    }
}

#[async_trait]
impl Backend for MokaBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self.cache.get(key).await)
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        self.cache.insert(key.clone(), value).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(match self.cache.remove(key).await {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn contains_key(&self, key: &CacheKey) -> BackendResult<bool> {
        Ok(self.cache.contains_key(key))
    }

    async fn clear(&self) -> BackendResult<()> {
        self.cache.invalidate_all();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_format(&self) -> ValueFormat {
        self.format
    }
}

impl CacheBackend for MokaBackend {}
