use std::path::Path;
use std::sync::Arc;

use bytesize::ByteSize;
use serde::Deserialize;
use stash_backend::CacheBackend;
use stash_http::{CacheRules, DEFAULT_MAX_BODY_SIZE};
use stash_tower::{CacheControl, CacheControlBuilder};

use crate::entry::{parse_path_entry, parse_pattern_entry};
use crate::error::ConfigError;

/// Top-level configuration document.
///
/// ```yaml
/// cache:
///   paths:
///     - "dev;900"
///   patterns:
///     - "root;.*(js|css)$;900"
/// filter:
///   priority: 5
/// capture:
///   max_body_size: 4 MiB
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cache: CacheSettings,
    pub filter: FilterSettings,
    pub capture: CaptureSettings,
}

/// Raw cache entries, parsed by [`Settings::rules`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// `subtree;maxAge` entries.
    pub paths: Vec<String>,
    /// `subtree;regex;maxAge` entries.
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSettings {
    /// Accepts plain byte counts or sizes such as `512 KiB`.
    pub max_body_size: ByteSize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            max_body_size: ByteSize::b(DEFAULT_MAX_BODY_SIZE as u64),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let settings = Self::from_yaml(&yaml)?;
        tracing::info!(path = %path.display(), "loaded cache configuration");
        Ok(settings)
    }

    /// Parses every entry, failing on the first malformed one.
    pub fn rules(&self) -> Result<CacheRules, ConfigError> {
        let mut rules = CacheRules::new();
        for entry in &self.cache.paths {
            rules.insert(parse_path_entry(entry)?);
        }
        for entry in &self.cache.patterns {
            rules.insert(parse_pattern_entry(entry)?);
        }
        tracing::info!(
            paths = self.cache.paths.len(),
            patterns = self.cache.patterns.len(),
            "cache rules parsed"
        );
        Ok(rules)
    }

    /// Largest captured body in bytes, saturating on 32-bit targets.
    pub fn max_body_size(&self) -> usize {
        usize::try_from(self.capture.max_body_size.as_u64()).unwrap_or(usize::MAX)
    }

    /// Applies rules, priority and capture limit to `builder`.
    pub fn configure<B>(
        &self,
        builder: CacheControlBuilder<B>,
    ) -> Result<CacheControlBuilder<B>, ConfigError> {
        Ok(builder
            .rules(self.rules()?)
            .priority(self.filter.priority)
            .max_body_size(self.max_body_size()))
    }

    /// Builds a filter over `backend`.
    pub fn into_layer<C>(self, backend: Arc<C>) -> Result<CacheControl<C>, ConfigError>
    where
        C: CacheBackend,
    {
        let builder = CacheControl::builder().shared_backend(backend);
        Ok(self.configure(builder)?.build())
    }
}
