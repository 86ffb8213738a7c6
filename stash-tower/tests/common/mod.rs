#![allow(dead_code)]

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use stash_backend::{
    Backend, BackendError, BackendResult, CacheBackend, CacheKey, CacheValue, DeleteStatus,
    MemoryBackend, Raw,
};
use stash_tower::CaptureBody;
use tower::Service;

#[derive(Debug, PartialEq, Eq)]
pub struct HandlerError(pub &'static str);

type Respond =
    dyn Fn(&Request<()>) -> Result<Response<Full<Bytes>>, HandlerError> + Send + Sync;

/// Downstream service counting how often it runs.
#[derive(Clone)]
pub struct Handler {
    calls: Arc<AtomicUsize>,
    respond: Arc<Respond>,
}

impl Handler {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&Request<()>) -> Result<Response<Full<Bytes>>, HandlerError> + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            respond: Arc::new(respond),
        }
    }

    /// `200 OK` echoing the request path and query.
    pub fn echo() -> Self {
        Self::new(|request| {
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "text/plain")
                .header("x-handler", "echo")
                .body(Full::new(Bytes::from(request.uri().to_string())))
                .unwrap())
        })
    }

    pub fn status(status: StatusCode) -> Self {
        Self::new(move |_| {
            Ok(Response::builder()
                .status(status)
                .body(Full::new(Bytes::from_static(b"status")))
                .unwrap())
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Service<Request<()>> for Handler {
    type Response = Response<Full<Bytes>>;
    type Error = HandlerError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<()>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ready((self.respond)(&request))
    }
}

pub fn get(uri: &str) -> Request<()> {
    Request::get(uri).body(()).unwrap()
}

pub async fn body_of(response: Response<CaptureBody<Full<Bytes>>>) -> Bytes {
    response
        .into_body()
        .collect()
        .await
        .unwrap_or_else(|never: Infallible| match never {})
        .to_bytes()
}

/// Backend whose operations can be made to fail, counting removals.
#[derive(Default)]
pub struct FlakyBackend {
    pub inner: MemoryBackend,
    pub fail_reads: bool,
    pub fail_writes: bool,
    removals: AtomicUsize,
}

impl FlakyBackend {
    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }
}

fn failure(op: &str) -> BackendError {
    BackendError::ConnectionError(format!("{op} refused").into())
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn read(&self, key: &CacheKey) -> BackendResult<Option<CacheValue<Raw>>> {
        if self.fail_reads {
            return Err(failure("read"));
        }
        self.inner.read(key).await
    }

    async fn write(&self, key: &CacheKey, value: CacheValue<Raw>) -> BackendResult<()> {
        if self.fail_writes {
            return Err(failure("write"));
        }
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &CacheKey) -> BackendResult<DeleteStatus> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn clear(&self) -> BackendResult<()> {
        self.inner.clear().await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

impl CacheBackend for FlakyBackend {}
