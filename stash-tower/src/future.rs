use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::ready;
use http::Response;
use http_body::Body as HttpBody;
use pin_project::pin_project;
use stash_http::CaptureBody;

/// Response future of [`CacheControlService`](crate::CacheControlService).
///
/// Requests outside every policy poll the inner service's future directly;
/// filtered requests run the boxed lookup, capture and store sequence.
#[pin_project(project = ResponseFutureProj)]
pub enum ResponseFuture<F, B, E>
where
    B: HttpBody,
{
    Bypass {
        #[pin]
        inner: F,
    },
    Filtered {
        inner: BoxFuture<'static, Result<Response<CaptureBody<B>>, E>>,
    },
}

impl<F, B, E> Future for ResponseFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: HttpBody,
{
    type Output = Result<Response<CaptureBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Bypass { inner } => {
                let result = ready!(inner.poll(cx));
                Poll::Ready(result.map(|response| response.map(CaptureBody::Passthrough)))
            }
            ResponseFutureProj::Filtered { inner } => inner.as_mut().poll(cx),
        }
    }
}
