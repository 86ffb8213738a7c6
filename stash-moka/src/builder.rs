//! Builder for configuring [`MokaBackend`].

use std::time::{Duration, Instant};

use chrono::Utc;
use moka::Expiry;
use moka::future::{Cache, CacheBuilder};
use moka::policy::EvictionPolicy;
use smol_str::SmolStr;
use stash_backend::ValueFormat;
use stash_core::{CacheKey, CacheValue, Raw};

use crate::backend::MokaBackend;

/// Expiration policy that derives the TTL from [`CacheValue::expire`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Expiration;

impl Expiry<CacheKey, CacheValue<Raw>> for Expiration {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Self::remaining(value)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &CacheValue<Raw>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        // The replacing value carries its own expiry; moka's default would keep the old one.
        Self::remaining(value)
    }
}

impl Expiration {
    fn remaining(value: &CacheValue<Raw>) -> Option<Duration> {
        value.expire().map(|expire| {
            let millis = (expire - Utc::now()).num_milliseconds();
            Duration::from_millis(millis.max(0) as u64)
        })
    }
}

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: the cache holds at most this many entries.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: the cache holds at most this many bytes (approximate).
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for [`MokaBackend`].
///
/// Capacity is mandatory and set exactly once, through either
/// [`max_entries`](Self::max_entries) or [`max_bytes`](Self::max_bytes);
/// `build()` only exists after one of them was called.
///
/// ```
/// use stash_backend::ValueFormat;
/// use stash_moka::MokaBackend;
///
/// let backend = MokaBackend::builder()
///     .name("responses")
///     .value_format(ValueFormat::Bincode)
///     .max_bytes(64 * 1024 * 1024)
///     .build();
/// ```
pub struct MokaBackendBuilder<Cap> {
    capacity: Cap,
    name: SmolStr,
    format: ValueFormat,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaBackendBuilder<NoCapacity> {
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            name: SmolStr::new_static("moka"),
            format: ValueFormat::default(),
            eviction_policy: None,
        }
    }

    /// Sets the maximum number of entries.
    pub fn max_entries(self, capacity: u64) -> MokaBackendBuilder<EntryCapacity> {
        MokaBackendBuilder {
            capacity: EntryCapacity(capacity),
            name: self.name,
            format: self.format,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Sets the approximate memory budget in bytes (keys plus serialized values).
    pub fn max_bytes(self, bytes: u64) -> MokaBackendBuilder<ByteCapacity> {
        MokaBackendBuilder {
            capacity: ByteCapacity(bytes),
            name: self.name,
            format: self.format,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl Default for MokaBackendBuilder<NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap> MokaBackendBuilder<Cap> {
    /// Name reported in logs and metric labels. Default `"moka"`.
    pub fn name(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = name.into();
        self
    }

    /// Serialization format of stored values. Default JSON.
    pub fn value_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    /// Overrides the eviction policy.
    ///
    /// Defaults to TinyLFU for entry capacity and LRU for byte capacity, where
    /// TinyLFU admission could reject large new entries that would fit after
    /// eviction.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaBackendBuilder<EntryCapacity> {
    pub fn build(self) -> MokaBackend {
        let policy = self
            .eviction_policy
            .unwrap_or_else(EvictionPolicy::tiny_lfu);
        let cache: Cache<CacheKey, CacheValue<Raw>> = CacheBuilder::new(self.capacity.0)
            .name(&self.name)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            name: self.name,
            format: self.format,
        }
    }
}

impl MokaBackendBuilder<ByteCapacity> {
    pub fn build(self) -> MokaBackend {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<CacheKey, CacheValue<Raw>> = CacheBuilder::new(self.capacity.0)
            .name(&self.name)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .expire_after(Expiration)
            .build();

        MokaBackend {
            cache,
            name: self.name,
            format: self.format,
        }
    }
}

fn byte_weigher(key: &CacheKey, value: &CacheValue<Raw>) -> u32 {
    (key.memory_size() + value.memory_size()).min(u32::MAX as usize) as u32
}
