//! Tower middleware caching HTTP `GET` responses.
//!
//! [`CacheControl`] is a Tower [`Layer`](tower::Layer). For each request it
//! resolves a caching policy from [`CacheRules`], answers from the backing
//! store when a fresh response is there, and otherwise calls the wrapped
//! service, sets `Expires` on its response and stores a copy.
//!
//! # Quick Start
//!
//! ```
//! use std::convert::Infallible;
//!
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use stash_http::{CacheConfig, CacheRules};
//! use stash_moka::MokaBackend;
//! use stash_tower::CacheControl;
//! use tower::{ServiceBuilder, service_fn};
//!
//! let rules = CacheRules::new()
//!     .with_config(CacheConfig::subtree("dev", 900))
//!     .with_config(CacheConfig::pattern("root", r".*\.(js|css)$", 900).unwrap());
//!
//! let layer = CacheControl::builder()
//!     .backend(MokaBackend::builder().max_entries(10_000).build())
//!     .rules(rules)
//!     .build();
//!
//! let service = ServiceBuilder::new()
//!     .layer(layer)
//!     .service(service_fn(|_req: http::Request<()>| async {
//!         Ok::<_, Infallible>(http::Response::new(Full::new(Bytes::from("hello"))))
//!     }));
//! ```
//!
//! # Behaviour
//!
//! | Request | Outcome |
//! |---------|---------|
//! | not `GET`, no policy, or max-age `0` | passed through, body untouched |
//! | fresh entry stored | replayed, inner service not called |
//! | stale entry stored | entry removed, handled as a miss |
//! | miss | inner service called; `200 OK` responses without `no-store`, `no-cache` or `private` are stored |
//!
//! Backend failures never fail a request: lookups degrade to misses and
//! failed stores are logged. Errors of the inner service are returned as-is.
//!
//! # Observability
//!
//! Each filtered request runs in a `stash.cache_control` span carrying the
//! cache key and status. The counters `stash_cache_hit_total`,
//! `stash_cache_save_total`, `stash_cache_miss_total` and
//! `stash_cache_bypass_total` are emitted through the `metrics` facade with a
//! `cache` label.
//!
//! # Handler-driven caching
//!
//! Handlers that pick their own max-age use [`CacheControl::response_cache`]:
//! [`ResponseCache::playback`] replays a fresh entry and
//! [`ResponseCache::save`] stores a freshly produced response. They share the
//! filter's cache and count under `stash_response_cache_hit_total` and
//! `stash_response_cache_save_total`.

pub mod future;
pub mod layer;
mod metrics;
pub mod playback;
pub mod service;

pub use layer::{
    CACHE_NAME, CacheControl, CacheControlBuilder, DEFAULT_CACHE_STATUS_HEADER, NotSet,
};
pub use playback::ResponseCache;
pub use service::CacheControlService;
pub use stash_http::{CacheConfig, CacheRules, CaptureBody};
