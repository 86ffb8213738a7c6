use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, TimeDelta, Utc};
use http::header::{DATE, EXPIRES};
use http::{HeaderValue, Method, Request, Response};
use http_body::Body as HttpBody;
use stash_backend::CacheBackend;
use stash_core::{CacheKey, CacheValue};
use stash_http::date::set_date_header;
use stash_http::{CacheConfig, CacheRules, CachedResponse, Capture, CaptureBody};
use tower::Service;
use tracing::{Instrument, Span};

use crate::future::ResponseFuture;
use crate::layer::Options;
use crate::metrics::{
    CACHE_BYPASS_COUNTER, CACHE_HIT_COUNTER, CACHE_MISS_COUNTER, CACHE_SAVE_COUNTER,
};

/// Service created by [`CacheControl`](crate::CacheControl).
///
/// For every `GET` request matching a policy with a positive max-age, the
/// service answers from the cache when it holds a fresh response. Otherwise
/// it calls the inner service, returns its response with `Expires` (and
/// `Date` if missing) set, and stores a copy when the response is
/// cacheable. Everything else is passed through untouched.
pub struct CacheControlService<S, C> {
    inner: S,
    backend: Arc<C>,
    rules: Arc<CacheRules>,
    options: Arc<Options>,
}

impl<S, C> CacheControlService<S, C> {
    pub(crate) fn new(
        inner: S,
        backend: Arc<C>,
        rules: Arc<CacheRules>,
        options: Arc<Options>,
    ) -> Self {
        Self {
            inner,
            backend,
            rules,
            options,
        }
    }

    fn max_age<B>(&self, request: &Request<B>) -> u32 {
        if request.method() != Method::GET {
            return 0;
        }
        self.rules
            .resolve(request.uri().path())
            .map_or(0, CacheConfig::max_age)
    }
}

impl<S, C> Clone for CacheControlService<S, C>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            backend: Arc::clone(&self.backend),
            rules: Arc::clone(&self.rules),
            options: Arc::clone(&self.options),
        }
    }
}

impl<S, C, ReqBody, ResBody> Service<Request<ReqBody>> for CacheControlService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    C: CacheBackend + 'static,
    ReqBody: Send + 'static,
    ResBody: HttpBody + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Send,
{
    type Response = Response<CaptureBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let max_age = self.max_age(&request);
        if max_age == 0 {
            tracing::trace!(method = %request.method(), path = request.uri().path(), "bypassing cache");
            metrics::counter!(*CACHE_BYPASS_COUNTER, "cache" => self.options.name.to_string())
                .increment(1);
            return ResponseFuture::Bypass {
                inner: self.inner.call(request),
            };
        }

        // The ready service goes into the future; the clone waits for the next poll_ready.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        let key = CacheKey::from_path_and_query(request.uri().path(), request.uri().query());
        let span = tracing::debug_span!(
            "stash.cache_control",
            cache.key = %key,
            cache.status = tracing::field::Empty,
        );
        let filter = Filter {
            backend: Arc::clone(&self.backend),
            options: Arc::clone(&self.options),
            key,
            max_age,
            counters: Counters::filter(),
        };

        ResponseFuture::Filtered {
            inner: Box::pin(filter.run(inner, request).instrument(span)),
        }
    }
}

/// Per-request state of a filtered request.
pub(crate) struct Filter<C> {
    pub(crate) backend: Arc<C>,
    pub(crate) options: Arc<Options>,
    pub(crate) key: CacheKey,
    pub(crate) max_age: u32,
    pub(crate) counters: Counters,
}

/// Counter names a [`Filter`] reports hits and saves under.
#[derive(Clone, Copy)]
pub(crate) struct Counters {
    pub(crate) hit: &'static str,
    pub(crate) save: &'static str,
}

impl Counters {
    pub(crate) fn filter() -> Self {
        Self {
            hit: *CACHE_HIT_COUNTER,
            save: *CACHE_SAVE_COUNTER,
        }
    }
}

impl<C> Filter<C>
where
    C: CacheBackend,
{
    async fn run<S, ReqBody, ResBody>(
        self,
        mut inner: S,
        request: Request<ReqBody>,
    ) -> Result<Response<CaptureBody<ResBody>>, S::Error>
    where
        S: Service<Request<ReqBody>, Response = Response<ResBody>>,
        ResBody: HttpBody,
    {
        if let Some(response) = self.lookup().await {
            return Ok(response);
        }

        Span::current().record("cache.status", "miss");
        self.count(*CACHE_MISS_COUNTER);

        let response = inner.call(request).await?;
        Ok(self.save(response).await)
    }

    /// A fresh stored response, if any. Stale entries are removed on the way.
    pub(crate) async fn lookup<B>(&self) -> Option<Response<CaptureBody<B>>>
    where
        B: HttpBody,
    {
        let entry = match self.backend.get::<CachedResponse>(&self.key).await {
            Ok(Some(value)) => value.into_inner(),
            Ok(None) => return None,
            Err(error) => {
                tracing::warn!(%error, "cache lookup failed, treating as miss");
                return None;
            }
        };

        if !entry.is_valid() {
            tracing::debug!(expired_at = %entry.expires_at(), "removing stale entry");
            if let Err(error) = self.backend.delete(&self.key).await {
                tracing::warn!(%error, "failed to remove stale entry");
            }
            return None;
        }

        match entry.replay() {
            Ok(response) => {
                Span::current().record("cache.status", "hit");
                self.count(self.counters.hit);
                Some(self.mark(response, "HIT"))
            }
            Err(error) => {
                tracing::warn!(%error, "stored entry cannot be replayed, treating as miss");
                None
            }
        }
    }

    /// Sets `Date` and `Expires` on a freshly produced response and stores a
    /// copy when it is cacheable.
    pub(crate) async fn save<B>(&self, response: Response<B>) -> Response<CaptureBody<B>>
    where
        B: HttpBody,
    {
        let now = Utc::now();
        let expires = now + TimeDelta::seconds(i64::from(self.max_age));

        let response = match self.options.capture.capture(response).await {
            Capture::Complete(mut captured) => {
                captured.ensure_date(now);
                captured.set_expires(expires);
                if self.max_age > 0 && captured.can_cache() {
                    self.store(CachedResponse::new_at(&captured, self.max_age, now))
                        .await;
                } else {
                    tracing::debug!(status = %captured.status(), "response not cacheable");
                }
                captured.into_response()
            }
            Capture::Incomplete(mut response) => {
                let headers = response.headers_mut();
                if !headers.contains_key(DATE) {
                    set_date_header(headers, DATE, now);
                }
                set_date_header(headers, EXPIRES, expires);
                response
            }
        };
        self.mark(response, "MISS")
    }

    async fn store(&self, entry: CachedResponse) {
        let expire: DateTime<Utc> = entry.expires_at();
        match self
            .backend
            .set(&self.key, &CacheValue::new(entry, Some(expire)))
            .await
        {
            Ok(()) => {
                tracing::debug!(max_age = self.max_age, "response stored");
                self.count(self.counters.save);
            }
            Err(error) => tracing::warn!(%error, "failed to store response"),
        }
    }

    fn mark<B>(&self, mut response: Response<B>, status: &'static str) -> Response<B> {
        if let Some(header) = &self.options.cache_status_header {
            response
                .headers_mut()
                .insert(header.clone(), HeaderValue::from_static(status));
        }
        response
    }

    fn count(&self, counter: &'static str) {
        metrics::counter!(counter, "cache" => self.options.name.to_string()).increment(1);
    }
}
