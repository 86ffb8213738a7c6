//! Bounded in-memory backend for stash, powered by [Moka](https://docs.rs/moka).
//!
//! Unlike [`MemoryBackend`](stash_backend::MemoryBackend), a [`MokaBackend`]
//! caps its size (by entry count or approximate bytes) and drops entries once
//! the expiry stored in their [`CacheValue`](stash_core::CacheValue) passes.
//!
//! ```
//! use stash_moka::MokaBackend;
//!
//! let backend = MokaBackend::builder().max_entries(10_000).build();
//! ```

mod backend;
mod builder;
mod manager;

pub use backend::MokaBackend;
pub use builder::{ByteCapacity, EntryCapacity, MokaBackendBuilder, NoCapacity};
pub use manager::MokaCacheManager;
pub use moka::policy::EvictionPolicy;
