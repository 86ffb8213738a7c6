use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use stash_core::{CacheKey, CacheValue, Raw};

use crate::{BackendError, DeleteStatus, ValueFormat};

pub type BackendResult<T> = Result<T, BackendError>;

/// Raw storage interface.
///
/// Implementations must be safe to share between concurrent requests; the
/// caches built on top of a backend add no locking of their own.
#[async_trait]
pub trait Backend: Sync + Send {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>>;

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()>;

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus>;

    async fn contains_key(&self, key: &CacheKey) -> BackendResult<bool> {
        Ok(self.read(key).await?.is_some())
    }

    /// Removes every entry of this cache.
    async fn clear(&self) -> BackendResult<()>;

    /// Returns the name of this backend, used in logs and metric labels.
    fn name(&self) -> &str {
        "backend"
    }

    fn value_format(&self) -> ValueFormat {
        ValueFormat::Json
    }
}

#[async_trait]
impl<B> Backend for Arc<B>
where
    B: Backend + ?Sized,
{
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        (**self).read(key).await
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        (**self).write(key, value).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        (**self).remove(key).await
    }

    async fn contains_key(&self, key: &CacheKey) -> BackendResult<bool> {
        (**self).contains_key(key).await
    }

    async fn clear(&self) -> BackendResult<()> {
        (**self).clear().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn value_format(&self) -> ValueFormat {
        (**self).value_format()
    }
}

/// High-level cache backend trait with typed operations.
///
/// `get` and `set` serialize through the backend's [`ValueFormat`]; a value
/// that fails to serialize is reported as [`BackendError::FormatError`] and
/// nothing is written.
pub trait CacheBackend: Backend {
    fn get<T>(
        &self,
        key: &CacheKey,
    ) -> impl Future<Output = BackendResult<Option<CacheValue<T>>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            match self.read(key).await? {
                Some(value) => {
                    let (expire, raw) = value.into_parts();
                    let data = self.value_format().deserialize::<T>(&raw)?;
                    Ok(Some(CacheValue::new(data, expire)))
                }
                None => Ok(None),
            }
        }
    }

    fn set<T>(
        &self,
        key: &CacheKey,
        value: &CacheValue<T>,
    ) -> impl Future<Output = BackendResult<()>> + Send
    where
        T: Serialize + Sync,
    {
        async move {
            let raw = self.value_format().serialize(value.data())?;
            self.write(key, CacheValue::new(raw, value.expire())).await
        }
    }

    fn delete(&self, key: &CacheKey) -> impl Future<Output = BackendResult<DeleteStatus>> + Send {
        async move { self.remove(key).await }
    }
}

impl<B> CacheBackend for Arc<B> where B: Backend + ?Sized {}
