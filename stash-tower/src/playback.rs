//! Handler-driven access to the filter's response cache.
//!
//! Some handlers decide for themselves how long their output stays valid. They
//! ask [`ResponseCache::playback`] first and, when nothing fresh is stored,
//! produce the response and hand it to [`ResponseCache::save`]. Both go through
//! the same backend and keys as [`CacheControl`](crate::CacheControl), so a
//! response saved here is replayed by the filter and the other way round.

use std::sync::Arc;

use http::{Method, Request, Response};
use http_body::Body as HttpBody;
use stash_backend::CacheBackend;
use stash_core::CacheKey;
use stash_http::CaptureBody;
use tracing::Instrument;

use crate::layer::Options;
use crate::metrics::{RESPONSE_CACHE_HIT_COUNTER, RESPONSE_CACHE_SAVE_COUNTER};
use crate::service::{Counters, Filter};

/// Playback and save of responses on behalf of a handler.
///
/// Obtained from [`CacheControl::response_cache`](crate::CacheControl::response_cache).
pub struct ResponseCache<C> {
    backend: Arc<C>,
    options: Arc<Options>,
}

impl<C> Clone for ResponseCache<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: Arc::clone(&self.options),
        }
    }
}

impl<C> ResponseCache<C>
where
    C: CacheBackend,
{
    pub(crate) fn new(backend: Arc<C>, options: Arc<Options>) -> Self {
        Self { backend, options }
    }

    /// Replays a fresh response stored for `request`.
    ///
    /// Returns `None` for anything but `GET`, for a `max_age` of `0` and when
    /// nothing fresh is stored; the caller then produces the response itself
    /// and passes it to [`save`](Self::save).
    pub async fn playback<ReqBody, ResBody>(
        &self,
        request: &Request<ReqBody>,
        max_age: u32,
    ) -> Option<Response<CaptureBody<ResBody>>>
    where
        ResBody: HttpBody,
    {
        if request.method() != Method::GET || max_age == 0 {
            return None;
        }
        let filter = self.filter(request, max_age);
        let span = tracing::debug_span!(
            "stash.response_cache",
            cache.key = %filter.key,
            cache.status = tracing::field::Empty,
        );
        filter.lookup().instrument(span).await
    }

    /// Sets `Date` and `Expires` on `response` and stores it for `request`.
    ///
    /// Non-`GET` requests get their response back untouched. With a `max_age`
    /// of `0` the headers are set but nothing is stored.
    pub async fn save<ReqBody, ResBody>(
        &self,
        request: &Request<ReqBody>,
        max_age: u32,
        response: Response<ResBody>,
    ) -> Response<CaptureBody<ResBody>>
    where
        ResBody: HttpBody,
    {
        if request.method() != Method::GET {
            return response.map(CaptureBody::Passthrough);
        }
        let filter = self.filter(request, max_age);
        let span = tracing::debug_span!("stash.response_cache", cache.key = %filter.key);
        filter.save(response).instrument(span).await
    }

    fn filter<B>(&self, request: &Request<B>, max_age: u32) -> Filter<C> {
        Filter {
            backend: Arc::clone(&self.backend),
            options: Arc::clone(&self.options),
            key: CacheKey::from_path_and_query(request.uri().path(), request.uri().query()),
            max_age,
            counters: Counters {
                hit: *RESPONSE_CACHE_HIT_COUNTER,
                save: *RESPONSE_CACHE_SAVE_COUNTER,
            },
        }
    }
}
