#![warn(missing_docs)]
//! # stash-core
//!
//! Core types shared by every crate of the stash HTTP response cache.
//!
//! The crate is intentionally small. It defines how cached units are
//! identified and how stored data is wrapped:
//!
//! - [`CacheKey`] - the string identity of a cacheable unit
//! - [`CacheValue`] - stored data plus an optional absolute expiry
//! - [`CacheScope`] - visibility of a named cache (process-local or shared)
//!
//! Protocol specifics live in `stash-http`, storage in `stash-backend`.

pub mod key;
pub mod scope;
pub mod value;

pub use key::CacheKey;
pub use scope::CacheScope;
pub use value::CacheValue;

/// Raw byte data type used for serialized cache values.
/// Using `Bytes` keeps clones of stored values reference counted.
pub type Raw = bytes::Bytes;
