//! Stored value envelope with expiration metadata.
//!
//! Backends store a [`CacheValue`]: the serialized payload plus an optional
//! absolute expiry. Backends that support per-entry TTL (such as the moka
//! backend) derive the TTL from the expiry; plain key-value stores ignore it
//! and leave freshness checks to the caller.

use chrono::{DateTime, Utc};
use std::mem::size_of;
use std::time::Duration;

use crate::Raw;

/// A cached value with optional expiration metadata.
///
/// ```
/// use stash_core::CacheValue;
/// use chrono::Utc;
///
/// let value = CacheValue::new("etag", Some(Utc::now() + chrono::Duration::hours(1)));
/// assert_eq!(value.data(), &"etag");
/// assert!(!value.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheValue<T> {
    data: T,
    expire: Option<DateTime<Utc>>,
}

impl<T> CacheValue<T> {
    /// Creates a new cache value.
    pub fn new(data: T, expire: Option<DateTime<Utc>>) -> Self {
        CacheValue { data, expire }
    }

    /// Returns a reference to the cached data.
    #[inline]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Returns when the data expires, if it expires at all.
    #[inline]
    pub fn expire(&self) -> Option<DateTime<Utc>> {
        self.expire
    }

    /// Consumes the value and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Consumes the value and returns the expiry and data separately.
    pub fn into_parts(self) -> (Option<DateTime<Utc>>, T) {
        (self.expire, self.data)
    }

    /// Returns `true` once the expiry has been reached.
    pub fn is_expired(&self) -> bool {
        self.expire.is_some_and(|expire| expire <= Utc::now())
    }

    /// Remaining time to live.
    ///
    /// `None` if the value never expires or is already expired.
    pub fn ttl(&self) -> Option<Duration> {
        self.expire.and_then(|expire| {
            expire
                .signed_duration_since(Utc::now())
                .to_std()
                .ok()
                .filter(|remaining| !remaining.is_zero())
        })
    }
}

impl CacheValue<Raw> {
    /// Returns the estimated memory usage of this value in bytes.
    pub fn memory_size(&self) -> usize {
        size_of::<Self>() + self.data.len()
    }
}
