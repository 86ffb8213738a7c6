use std::sync::Arc;

use dashmap::DashMap;
use smol_str::SmolStr;
use stash_backend::{CacheManager, ValueFormat};
use stash_core::CacheScope;

use crate::MokaBackend;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Cache manager handing out bounded [`MokaBackend`] stores.
///
/// Every cache it creates gets the same entry capacity and value format.
#[derive(Debug)]
pub struct MokaCacheManager {
    caches: DashMap<(SmolStr, CacheScope), Arc<MokaBackend>>,
    max_entries: u64,
    format: ValueFormat,
}

impl MokaCacheManager {
    pub fn new(max_entries: u64) -> Self {
        Self {
            caches: DashMap::new(),
            max_entries,
            format: ValueFormat::default(),
        }
    }

    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for MokaCacheManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl CacheManager for MokaCacheManager {
    type Cache = MokaBackend;

    fn cache(&self, name: &str, scope: CacheScope) -> Arc<MokaBackend> {
        let entry = self
            .caches
            .entry((SmolStr::new(name), scope))
            .or_insert_with(|| {
                tracing::debug!(cache = name, %scope, max_entries = self.max_entries, "creating moka cache");
                Arc::new(
                    MokaBackend::builder()
                        .name(name)
                        .value_format(self.format)
                        .max_entries(self.max_entries)
                        .build(),
                )
            });
        Arc::clone(entry.value())
    }
}
