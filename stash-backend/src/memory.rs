//! Unbounded in-memory backend built on `DashMap`.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use smol_str::SmolStr;
use stash_core::{CacheKey, CacheValue, Raw};

use crate::{Backend, BackendResult, CacheBackend, DeleteStatus, ValueFormat};

/// Concurrent in-memory key-value store.
///
/// Entries are kept until they are removed or the cache is cleared; the
/// backend applies no eviction of its own, so expired entries linger until
/// a reader notices them and removes them. Use the moka backend when a
/// bounded store with TTL eviction is wanted.
///
/// Cloning shares the underlying map.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    store: Arc<DashMap<CacheKey, CacheValue<Raw>>>,
    name: SmolStr,
    format: ValueFormat,
}

impl MemoryBackend {
    /// Creates an empty backend named `memory`.
    pub fn new() -> Self {
        Self::named("memory")
    }

    /// Creates an empty backend with the given name.
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Self {
            store: Arc::new(DashMap::new()),
            name: name.into(),
            format: ValueFormat::default(),
        }
    }

    /// Sets the serialization format of stored values.
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        Ok(self.store.get(key).map(|value| value.clone()))
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        self.store.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        Ok(match self.store.remove(key) {
            Some(_) => DeleteStatus::Deleted(1),
            None => DeleteStatus::Missing,
        })
    }

    async fn contains_key(&self, key: &CacheKey) -> BackendResult<bool> {
        Ok(self.store.contains_key(key))
    }

    async fn clear(&self) -> BackendResult<()> {
        self.store.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn value_format(&self) -> ValueFormat {
        self.format
    }
}

impl CacheBackend for MemoryBackend {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    #[tokio::test]
    async fn typed_round_trip_keeps_expiry() {
        let backend = MemoryBackend::new();
        let key = CacheKey::new("joe:inbox");
        let expire = Some(Utc::now() + TimeDelta::seconds(30));

        backend
            .set(&key, &CacheValue::new("tag-1".to_string(), expire))
            .await
            .unwrap();

        let value = backend.get::<String>(&key).await.unwrap().unwrap();
        assert_eq!(value.data(), "tag-1");
        assert_eq!(value.expire(), expire);
    }

    #[tokio::test]
    async fn expired_entries_are_kept_until_removed() {
        let backend = MemoryBackend::new();
        let key = CacheKey::new("/dev/app.js");
        let expire = Some(Utc::now() - TimeDelta::seconds(1));

        backend
            .set(&key, &CacheValue::new(1u32, expire))
            .await
            .unwrap();

        assert!(backend.contains_key(&key).await.unwrap());
        assert_eq!(backend.delete(&key).await.unwrap(), DeleteStatus::Deleted(1));
        assert_eq!(backend.delete(&key).await.unwrap(), DeleteStatus::Missing);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn reading_with_the_wrong_type_is_a_format_error() {
        let backend = MemoryBackend::new().with_format(ValueFormat::Json);
        let key = CacheKey::new("k");
        backend
            .set(&key, &CacheValue::new("text".to_string(), None))
            .await
            .unwrap();

        let err = backend.get::<u64>(&key).await.unwrap_err();
        assert!(matches!(err, crate::BackendError::FormatError(_)));
    }
}
