//! Response body buffering for capture and replay.
//!
//! The filter reads the downstream body before anything is sent to the
//! client. Reading may stop early, because the body grew past the capture
//! limit or because the stream failed. The client must still see exactly
//! what the handler produced, so the part already read is kept as a prefix
//! and replayed ahead of the untouched remainder of the stream:
//!
//! ```text
//! handler:  [ 4 MiB read ][ 60 MiB not read ... ]
//! client:   [ prefix      ][ streamed remainder  ]
//! ```
//!
//! ## Body states
//!
//! - **Complete**: the whole body is in memory. Used for captured responses
//!   and for cache hits.
//! - **Partial**: buffered prefix, then the rest of the stream or the error
//!   that interrupted reading.
//! - **Passthrough**: the body was never read (requests the filter does not
//!   cache).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use pin_project::pin_project;

/// What follows the buffered prefix of a partially read body.
pub enum Remaining<B>
where
    B: HttpBody,
{
    /// The stream continues.
    Body(Pin<Box<B>>),
    /// Reading failed; the error is yielded once, then the stream ends.
    Error(Option<B::Error>),
}

impl<B> std::fmt::Debug for Remaining<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Remaining::Body(_) => f.write_str("Remaining::Body(..)"),
            Remaining::Error(err) => write!(f, "Remaining::Error(pending: {})", err.is_some()),
        }
    }
}

/// Body of every response the filter hands back to the client.
#[pin_project(project = CaptureBodyProj)]
pub enum CaptureBody<B>
where
    B: HttpBody,
{
    /// Fully buffered body. The `Option` lets the data be yielded once.
    Complete(Option<Bytes>),

    /// Buffered prefix, an optional trailers frame, then the remainder.
    Partial {
        prefix: Option<Bytes>,
        trailers: Option<HeaderMap>,
        remaining: Remaining<B>,
    },

    /// Untouched downstream body.
    Passthrough(#[pin] B),
}

impl<B> CaptureBody<B>
where
    B: HttpBody,
{
    /// Fully buffered body.
    pub fn complete(data: Bytes) -> Self {
        CaptureBody::Complete(Some(data))
    }

    pub fn empty() -> Self {
        CaptureBody::Complete(None)
    }
}

impl<B> std::fmt::Debug for CaptureBody<B>
where
    B: HttpBody,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureBody::Complete(data) => f
                .debug_tuple("Complete")
                .field(&data.as_ref().map(Bytes::len))
                .finish(),
            CaptureBody::Partial {
                prefix, remaining, ..
            } => f
                .debug_struct("Partial")
                .field("prefix", &prefix.as_ref().map(Bytes::len))
                .field("remaining", remaining)
                .finish(),
            CaptureBody::Passthrough(_) => f.write_str("Passthrough(..)"),
        }
    }
}

impl<B> HttpBody for CaptureBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            CaptureBodyProj::Complete(data) => match data.take() {
                Some(bytes) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                None => Poll::Ready(None),
            },
            CaptureBodyProj::Partial {
                prefix,
                trailers,
                remaining,
            } => {
                if let Some(prefix) = prefix.take() {
                    return Poll::Ready(Some(Ok(Frame::data(prefix))));
                }
                if let Some(trailers) = trailers.take() {
                    return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
                }
                match remaining {
                    Remaining::Body(body) => match body.as_mut().poll_frame(cx) {
                        Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Ok(
                            frame.map_data(|mut data| data.copy_to_bytes(data.remaining()))
                        ))),
                        Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
                        Poll::Ready(None) => Poll::Ready(None),
                        Poll::Pending => Poll::Pending,
                    },
                    Remaining::Error(err) => Poll::Ready(err.take().map(Err)),
                }
            }
            CaptureBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => Poll::Ready(Some(Ok(
                    frame.map_data(|mut data| data.copy_to_bytes(data.remaining()))
                ))),
                Poll::Ready(Some(Err(err))) => Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            CaptureBody::Complete(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            CaptureBody::Complete(None) => SizeHint::with_exact(0),
            CaptureBody::Partial {
                prefix, remaining, ..
            } => {
                let prefix_len = prefix.as_ref().map_or(0, |b| b.len() as u64);
                match remaining {
                    Remaining::Body(body) => {
                        let hint = body.size_hint();
                        let lower = hint.lower().saturating_add(prefix_len);
                        let mut result = SizeHint::new();
                        result.set_lower(lower);
                        // An upstream Content-Length based hint does not shrink as the
                        // prefix is read, so keep upper >= lower.
                        if let Some(upper) = hint.upper() {
                            result.set_upper(upper.saturating_add(prefix_len).max(lower));
                        }
                        result
                    }
                    Remaining::Error(_) => SizeHint::with_exact(prefix_len),
                }
            }
            CaptureBody::Passthrough(body) => body.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            CaptureBody::Complete(data) => data.is_none(),
            CaptureBody::Partial {
                prefix,
                trailers,
                remaining,
            } => {
                prefix.is_none()
                    && trailers.is_none()
                    && match remaining {
                        Remaining::Body(body) => body.is_end_stream(),
                        Remaining::Error(err) => err.is_none(),
                    }
            }
            CaptureBody::Passthrough(body) => body.is_end_stream(),
        }
    }
}

/// Outcome of reading a body up to a size limit.
#[derive(Debug)]
pub enum Collected<B>
where
    B: HttpBody,
{
    /// The whole body, within the limit.
    Complete(Bytes),
    /// Reading stopped early. The body replays everything the stream produced.
    Incomplete(CaptureBody<B>),
}

/// Reads `body` to the end, unless it grows past `limit` bytes, fails, or
/// carries trailers.
///
/// Nothing read is dropped: an incomplete result replays the consumed prefix
/// (and trailers) ahead of whatever the stream has left.
pub async fn collect_limited<B>(body: B, limit: usize) -> Collected<B>
where
    B: HttpBody,
{
    let mut body = Box::pin(body);
    let mut buffer = BytesMut::new();

    loop {
        match body.frame().await {
            None => return Collected::Complete(buffer.freeze()),
            Some(Ok(frame)) => match frame.into_data() {
                Ok(mut data) => {
                    while data.has_remaining() {
                        let chunk = data.chunk();
                        let len = chunk.len();
                        buffer.extend_from_slice(chunk);
                        data.advance(len);
                    }
                    if buffer.len() > limit {
                        return Collected::Incomplete(partial(buffer, None, Remaining::Body(body)));
                    }
                }
                Err(frame) => {
                    let trailers = frame.into_trailers().ok();
                    return Collected::Incomplete(partial(buffer, trailers, Remaining::Body(body)));
                }
            },
            Some(Err(err)) => {
                return Collected::Incomplete(partial(buffer, None, Remaining::Error(Some(err))));
            }
        }
    }
}

fn partial<B>(buffer: BytesMut, trailers: Option<HeaderMap>, remaining: Remaining<B>) -> CaptureBody<B>
where
    B: HttpBody,
{
    let prefix = (!buffer.is_empty()).then(|| buffer.freeze());
    CaptureBody::Partial {
        prefix,
        trailers,
        remaining,
    }
}
