use std::sync::Arc;

use http::HeaderName;
use smol_str::SmolStr;
use stash_backend::{Backend, BackendResult, CacheBackend, CacheManager};
use stash_core::CacheScope;
use stash_http::{CacheRules, ResponseCapture};
use tower::Layer;

use crate::playback::ResponseCache;
use crate::service::CacheControlService;

/// Name of the cache the filter asks a [`CacheManager`] for.
pub const CACHE_NAME: &str = "stash.cache_control";

/// Default value of the optional cache status header.
pub const DEFAULT_CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Settings shared by the layer and every service it creates.
#[derive(Debug)]
pub(crate) struct Options {
    pub(crate) name: SmolStr,
    pub(crate) capture: ResponseCapture,
    pub(crate) cache_status_header: Option<HeaderName>,
}

/// Tower layer caching `GET` responses according to [`CacheRules`].
pub struct CacheControl<C> {
    backend: Arc<C>,
    rules: Arc<CacheRules>,
    options: Arc<Options>,
    priority: i32,
}

impl<C> Clone for CacheControl<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            rules: Arc::clone(&self.rules),
            options: Arc::clone(&self.options),
            priority: self.priority,
        }
    }
}

impl CacheControl<NotSet> {
    pub fn builder() -> CacheControlBuilder<NotSet> {
        CacheControlBuilder::default()
    }
}

impl<C> CacheControl<C>
where
    C: CacheBackend,
{
    /// Ordering hint for hosts that stack several filters: higher runs earlier.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn rules(&self) -> &CacheRules {
        &self.rules
    }

    pub fn backend(&self) -> &Arc<C> {
        &self.backend
    }

    /// Playback and save for handlers that manage their own max-age, sharing
    /// this filter's cache.
    pub fn response_cache(&self) -> ResponseCache<C> {
        ResponseCache::new(Arc::clone(&self.backend), Arc::clone(&self.options))
    }

    /// Drops every cached response, e.g. when the filter is taken out of service.
    pub async fn clear(&self) -> BackendResult<()> {
        tracing::info!(cache = %self.options.name, "clearing response cache");
        self.backend.clear().await
    }
}

impl<S, C> Layer<S> for CacheControl<C> {
    type Service = CacheControlService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheControlService::new(
            inner,
            Arc::clone(&self.backend),
            Arc::clone(&self.rules),
            Arc::clone(&self.options),
        )
    }
}

/// Marker for a builder that has no backend yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotSet;

/// Builder for [`CacheControl`].
///
/// ```
/// use stash_backend::MemoryBackend;
/// use stash_http::{CacheConfig, CacheRules};
/// use stash_tower::CacheControl;
///
/// let layer = CacheControl::builder()
///     .backend(MemoryBackend::new())
///     .rules(CacheRules::new().with_config(CacheConfig::subtree("dev", 900)))
///     .priority(5)
///     .build();
/// assert_eq!(layer.priority(), 5);
/// ```
pub struct CacheControlBuilder<B> {
    backend: B,
    rules: CacheRules,
    name: Option<SmolStr>,
    capture: ResponseCapture,
    cache_status_header: Option<HeaderName>,
    priority: i32,
}

impl Default for CacheControlBuilder<NotSet> {
    fn default() -> Self {
        Self {
            backend: NotSet,
            rules: CacheRules::default(),
            name: None,
            capture: ResponseCapture::default(),
            cache_status_header: None,
            priority: 0,
        }
    }
}

impl<B> CacheControlBuilder<B> {
    pub fn backend<C: CacheBackend>(self, backend: C) -> CacheControlBuilder<Arc<C>> {
        self.shared_backend(Arc::new(backend))
    }

    /// Uses a backend that is also held elsewhere.
    pub fn shared_backend<C: CacheBackend>(self, backend: Arc<C>) -> CacheControlBuilder<Arc<C>> {
        CacheControlBuilder {
            backend,
            rules: self.rules,
            name: self.name,
            capture: self.capture,
            cache_status_header: self.cache_status_header,
            priority: self.priority,
        }
    }

    /// Uses the instance-scoped cache [`CACHE_NAME`] of `manager`.
    pub fn cache_manager<M: CacheManager>(self, manager: &M) -> CacheControlBuilder<Arc<M::Cache>> {
        self.shared_backend(manager.cache(CACHE_NAME, CacheScope::Instance))
    }

    pub fn rules(self, rules: CacheRules) -> Self {
        Self { rules, ..self }
    }

    /// Label of this filter in logs and metrics. Defaults to the backend name.
    pub fn name(self, name: impl Into<SmolStr>) -> Self {
        Self {
            name: Some(name.into()),
            ..self
        }
    }

    /// Largest response body that is captured for caching.
    pub fn max_body_size(self, bytes: usize) -> Self {
        Self {
            capture: ResponseCapture::new(bytes),
            ..self
        }
    }

    /// Marks filtered responses with `HIT` or `MISS` in `header`.
    ///
    /// Off unless set; see [`DEFAULT_CACHE_STATUS_HEADER`].
    pub fn cache_status_header(self, header: HeaderName) -> Self {
        Self {
            cache_status_header: Some(header),
            ..self
        }
    }

    pub fn priority(self, priority: i32) -> Self {
        Self { priority, ..self }
    }
}

impl<C> CacheControlBuilder<Arc<C>>
where
    C: CacheBackend,
{
    pub fn build(self) -> CacheControl<C> {
        let name = self
            .name
            .unwrap_or_else(|| SmolStr::new(self.backend.name()));
        tracing::info!(
            cache = %name,
            policies = self.rules.len(),
            priority = self.priority,
            max_body_size = self.capture.max_body_size(),
            "cache control filter configured"
        );
        for config in self.rules.iter() {
            tracing::debug!(
                cache = %name,
                subtree = config.subtree_name(),
                pattern = config.pattern_source(),
                max_age = config.max_age(),
                "caching policy"
            );
        }
        CacheControl {
            backend: self.backend,
            rules: Arc::new(self.rules),
            options: Arc::new(Options {
                name,
                capture: self.capture,
                cache_status_header: self.cache_status_header,
            }),
            priority: self.priority,
        }
    }
}
