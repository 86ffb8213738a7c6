//! Named cache registry.
//!
//! Components do not construct their stores directly; they ask a
//! [`CacheManager`] for the cache registered under a name and scope. Two
//! components asking for the same `(name, scope)` share one store.

use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;
use stash_core::CacheScope;

use crate::{CacheBackend, MemoryBackend, ValueFormat};

/// Hands out named caches.
pub trait CacheManager: Send + Sync {
    /// Store type of the caches handed out by this manager.
    type Cache: CacheBackend + 'static;

    /// Returns the cache registered under `name` in `scope`, creating it on
    /// first use.
    fn cache(&self, name: &str, scope: CacheScope) -> Arc<Self::Cache>;
}

impl<M> CacheManager for Arc<M>
where
    M: CacheManager + ?Sized,
{
    type Cache = M::Cache;

    fn cache(&self, name: &str, scope: CacheScope) -> Arc<Self::Cache> {
        (**self).cache(name, scope)
    }
}

/// Cache manager backed by [`MemoryBackend`] stores.
///
/// Both scopes are process-local here: a [`CacheScope::Cluster`] cache is a
/// separate store from the [`CacheScope::Instance`] cache of the same name,
/// but it is not replicated.
#[derive(Debug, Default)]
pub struct MemoryCacheManager {
    caches: DashMap<(SmolStr, CacheScope), Arc<MemoryBackend>>,
    format: ValueFormat,
}

impl MemoryCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialization format of the caches created from now on.
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of caches created so far.
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

impl CacheManager for MemoryCacheManager {
    type Cache = MemoryBackend;

    fn cache(&self, name: &str, scope: CacheScope) -> Arc<MemoryBackend> {
        let entry = self
            .caches
            .entry((SmolStr::new(name), scope))
            .or_insert_with(|| {
                tracing::debug!(cache = name, %scope, "creating cache");
                Arc::new(MemoryBackend::named(name).with_format(self.format))
            });
        Arc::clone(entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backend;

    #[test]
    fn same_name_and_scope_share_a_store() {
        let manager = MemoryCacheManager::new();
        let first = manager.cache("responses", CacheScope::Instance);
        let second = manager.cache("responses", CacheScope::Instance);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.name(), "responses");
    }

    #[test]
    fn scopes_are_separate_stores() {
        let manager = MemoryCacheManager::new();
        let instance = manager.cache("etags", CacheScope::Instance);
        let cluster = manager.cache("etags", CacheScope::Cluster);
        assert!(!Arc::ptr_eq(&instance, &cluster));
        assert_eq!(manager.len(), 2);
    }
}
