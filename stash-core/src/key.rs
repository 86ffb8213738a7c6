//! Cache key type and constructors.
//!
//! Keys are plain strings. The constructors below fix the layouts used by
//! the different caches so that every producer of a key agrees on it:
//!
//! | Constructor | Layout | Used by |
//! |-------------|--------|---------|
//! | [`CacheKey::from_path_and_query`] | `path?query` or `path` | response cache |
//! | [`CacheKey::for_user_path`] | `user-path` | per-path ETag cache |
//! | [`CacheKey::for_user_category`] | `user:category` | per-category ETag cache |
//!
//! ```
//! use stash_core::CacheKey;
//!
//! let key = CacheKey::from_path_and_query("/var/search/public/all.json", Some("q=rust"));
//! assert_eq!(key.as_str(), "/var/search/public/all.json?q=rust");
//!
//! let key = CacheKey::from_path_and_query("/dev/index.html", None);
//! assert_eq!(key.as_str(), "/dev/index.html");
//!
//! let key = CacheKey::for_user_category("joe", "contacts");
//! assert_eq!(key.as_str(), "joe:contacts");
//! ```
//!
//! [`CacheKey`] wraps a [`SmolStr`]: short keys are stored inline and
//! longer ones share a reference counted buffer, so cloning a key never
//! copies its content.

use std::fmt;
use std::mem::size_of;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Longest string [`SmolStr`] keeps inline without a heap allocation.
const INLINE_CAPACITY: usize = 23;

/// A cache key identifying a stored entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(SmolStr);

impl CacheKey {
    /// Creates a key from an arbitrary string.
    pub fn new(key: impl Into<SmolStr>) -> Self {
        CacheKey(key.into())
    }

    /// Key of a cached response: `path?query`, or `path` alone when the
    /// query is absent or empty.
    pub fn from_path_and_query(path: &str, query: Option<&str>) -> Self {
        match query {
            Some(query) if !query.is_empty() => {
                let mut key = String::with_capacity(path.len() + query.len() + 1);
                key.push_str(path);
                key.push('?');
                key.push_str(query);
                CacheKey(key.into())
            }
            _ => CacheKey(path.into()),
        }
    }

    /// Key of a per-path ETag: `user-path`.
    pub fn for_user_path(user: &str, path: &str) -> Self {
        CacheKey(format!("{user}-{path}").into())
    }

    /// Key of a per-category ETag: `user:category`.
    pub fn for_user_category(user: &str, category: &str) -> Self {
        CacheKey(format!("{user}:{category}").into())
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the estimated memory usage of this key in bytes.
    pub fn memory_size(&self) -> usize {
        let heap = if self.0.len() > INLINE_CAPACITY {
            self.0.len()
        } else {
            0
        };
        size_of::<Self>() + heap
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey::new(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::new(value)
    }
}
