//! Traits and structs for stash backend interaction.
//!
//! A backend is the shared key-value store behind every cache of the
//! workspace. [`Backend`] is the narrow raw interface (bytes in, bytes out);
//! [`CacheBackend`] layers typed, serializing `get`/`set`/`delete` on top of
//! it. [`CacheManager`] hands out named caches per [`CacheScope`].
//!
//! If you want to plug in your own store, implement [`Backend`] and add an
//! empty `impl CacheBackend for YourBackend {}`.
mod backend;
pub mod error;
pub mod format;
pub mod manager;
mod memory;

pub use backend::{Backend, BackendResult, CacheBackend};
pub use error::BackendError;
pub use format::{FormatError, ValueFormat};
pub use manager::{CacheManager, MemoryCacheManager};
pub use memory::MemoryBackend;
pub use stash_core::{CacheKey, CacheScope, CacheValue, Raw};

/// Status of deleting result.
#[derive(Debug, PartialEq, Eq)]
pub enum DeleteStatus {
    /// Record successfully deleted.
    Deleted(u32),
    /// Record already missing.
    Missing,
}
