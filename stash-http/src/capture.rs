//! Capturing downstream responses.
//!
//! [`ResponseCapture`] turns a live response into a [`CapturedResponse`]:
//! status, headers and the complete body held in memory. The captured
//! response can then be inspected ([`CapturedResponse::can_cache`]),
//! amended (`Expires`, `Date`) and handed to the client with
//! [`CapturedResponse::into_response`], while an immutable
//! [`CachedResponse`](crate::CachedResponse) snapshot goes to the store.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::header::{CACHE_CONTROL, DATE, EXPIRES};
use http::response::Parts;
use http::{HeaderMap, Response, StatusCode};
use http_body::Body as HttpBody;

use crate::body::{CaptureBody, Collected, collect_limited};
use crate::date::set_date_header;

/// Default largest body captured for caching: 4 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 4 * 1024 * 1024;

/// Response extension marking a response as not cacheable.
///
/// Handlers insert it when a `200 OK` must not be stored even though the
/// matched policy would allow it.
///
/// ```
/// use stash_http::DoNotCache;
///
/// let mut response = http::Response::new(());
/// response.extensions_mut().insert(DoNotCache);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DoNotCache;

/// Reads downstream responses into memory.
#[derive(Clone, Copy, Debug)]
pub struct ResponseCapture {
    max_body_size: usize,
}

impl Default for ResponseCapture {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_SIZE)
    }
}

impl ResponseCapture {
    pub fn new(max_body_size: usize) -> Self {
        Self { max_body_size }
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Buffers the response body.
    ///
    /// Bodies larger than the limit, bodies with trailers and bodies whose
    /// stream fails are returned as [`Capture::Incomplete`]; the response in
    /// it still yields every byte (or error) the handler produced.
    pub async fn capture<B>(&self, response: Response<B>) -> Capture<B>
    where
        B: HttpBody,
    {
        let (parts, body) = response.into_parts();
        match collect_limited(body, self.max_body_size).await {
            Collected::Complete(body) => Capture::Complete(CapturedResponse { parts, body }),
            Collected::Incomplete(body) => {
                tracing::debug!(
                    status = %parts.status,
                    limit = self.max_body_size,
                    "response body not fully captured"
                );
                Capture::Incomplete(Response::from_parts(parts, body))
            }
        }
    }
}

/// Result of [`ResponseCapture::capture`].
#[derive(Debug)]
pub enum Capture<B>
where
    B: HttpBody,
{
    /// The whole response is in memory.
    Complete(CapturedResponse),
    /// The body could not be fully read; the response is never cacheable.
    Incomplete(Response<CaptureBody<B>>),
}

/// A response held entirely in memory.
#[derive(Debug)]
pub struct CapturedResponse {
    parts: Parts,
    body: Bytes,
}

impl CapturedResponse {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether this response may be stored.
    ///
    /// Only `200 OK` responses qualify, and only if neither `Cache-Control`
    /// (`no-store`, `no-cache`, `private`) nor the [`DoNotCache`] extension
    /// forbids it.
    pub fn can_cache(&self) -> bool {
        if self.parts.status != StatusCode::OK {
            return false;
        }
        if self.parts.extensions.get::<DoNotCache>().is_some() {
            return false;
        }
        !self
            .parts
            .headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .map(|directive| directive.trim())
            .any(|directive| {
                directive.eq_ignore_ascii_case("no-store")
                    || directive.eq_ignore_ascii_case("no-cache")
                    || directive.eq_ignore_ascii_case("private")
            })
    }

    /// Sets `Expires` to `at`.
    pub fn set_expires(&mut self, at: DateTime<Utc>) {
        set_date_header(&mut self.parts.headers, EXPIRES, at);
    }

    /// Adds a `Date` header if the handler did not set one.
    pub fn ensure_date(&mut self, now: DateTime<Utc>) {
        if !self.parts.headers.contains_key(DATE) {
            set_date_header(&mut self.parts.headers, DATE, now);
        }
    }

    /// Turns the captured response back into a live one, body included.
    pub fn into_response<B>(self) -> Response<CaptureBody<B>>
    where
        B: HttpBody,
    {
        Response::from_parts(self.parts, CaptureBody::complete(self.body))
    }
}
