//! Visibility scope of a named cache.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the entries of a named cache are visible.
///
/// A cache manager hands out one cache per `(name, scope)` pair, so the same
/// name may exist once per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CacheScope {
    /// Entries live in this process only.
    #[default]
    Instance,
    /// Entries are shared by every node of a cluster.
    Cluster,
}

impl CacheScope {
    /// Lowercase name, used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheScope::Instance => "instance",
            CacheScope::Cluster => "cluster",
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
