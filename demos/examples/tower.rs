//! Cache-control filter in front of a plain Tower service served by Hyper.
//!
//! Run:
//!   RUST_LOG=info,stash=debug cargo run -p stash-demos --example tower
//!
//! Endpoints:
//!   - http://localhost:3001/dev/time     - current time (cached for 10s)
//!   - http://localhost:3001/app.js       - static script (cached for 60s)
//!   - http://localhost:3001/me/profile   - per-user profile with an ETag (not cached)
//!   - http://localhost:3001/me/touch     - POST, invalidates the profile ETag
//!
//! Try it:
//!   curl -i http://localhost:3001/dev/time                        # MISS, then HIT
//!   curl -i -H 'x-user: alice' http://localhost:3001/me/profile   # note the ETag
//!   curl -i -H 'x-user: alice' -H 'if-none-match: <etag>' http://localhost:3001/me/profile

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use stash_backend::MemoryCacheManager;
use stash_configuration::Settings;
use stash_http::{CategoryETagCache, RemoteUser};
use stash_moka::MokaBackend;
use stash_tower::DEFAULT_CACHE_STATUS_HEADER;
use tokio::net::TcpListener;
use tower::{Service, ServiceBuilder};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
cache:
  paths:
    - "dev;10"
    - "me;0"
  patterns:
    - "root;.*\\.(js|css)$;maxAge:60"
filter:
  priority: 5
capture:
  max_body_size: 1 MiB
"#;

const PROFILE: &str = "profile";

#[derive(Clone)]
struct AppService {
    etags: CategoryETagCache<stash_backend::MemoryBackend>,
}

impl<B> Service<Request<B>> for AppService
where
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let etags = self.etags.clone();
        let mut request = request.map(|_| ());
        if let Some(user) = request
            .headers()
            .get("x-user")
            .and_then(|value| value.to_str().ok())
        {
            let user = RemoteUser::new(user);
            request.extensions_mut().insert(user);
        }

        Box::pin(async move {
            let response = match (request.method(), request.uri().path()) {
                (&Method::GET, "/dev/time") => text(format!("{}\n", chrono::Utc::now().to_rfc3339())),
                (&Method::GET, "/app.js") => text("console.log('hello from stash');\n".to_owned()),
                (&Method::GET, "/me/profile") => profile(&etags, &request).await,
                (&Method::POST, "/me/touch") => {
                    let user = RemoteUser::of(&request).to_owned();
                    if let Err(error) = etags.invalidate(PROFILE, &user).await {
                        tracing::warn!(%error, "failed to invalidate profile etag");
                    }
                    text("touched\n".to_owned())
                }
                _ => {
                    let mut response = text("Not Found\n".to_owned());
                    *response.status_mut() = StatusCode::NOT_FOUND;
                    response
                }
            };
            Ok(response)
        })
    }
}

fn text(body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    response
        .headers_mut()
        .insert(http::header::CONTENT_TYPE, "text/plain".parse().unwrap());
    response
}

async fn profile(
    etags: &CategoryETagCache<stash_backend::MemoryBackend>,
    request: &Request<()>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::default());
    match etags
        .client_has_fresh_etag(PROFILE, request, &mut response)
        .await
    {
        Ok(true) => return response,
        Ok(false) => {}
        Err(error) => tracing::warn!(%error, "etag lookup failed"),
    }

    let mut response = text(format!("profile of {}\n", RemoteUser::of(request)));
    if let Err(error) = etags.record_response(PROFILE, request, &mut response).await {
        tracing::warn!(%error, "failed to record profile etag");
    }
    response
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,stash=debug")),
        )
        .init();

    let settings = Settings::from_yaml(CONFIG)?;
    let backend = MokaBackend::builder().max_entries(10_000).name("responses").build();
    let cache_control = settings
        .configure(stash_tower::CacheControl::builder().backend(backend))?
        .cache_status_header(DEFAULT_CACHE_STATUS_HEADER)
        .build();

    let manager = MemoryCacheManager::new();
    let service = ServiceBuilder::new()
        .layer(cache_control)
        .service(AppService {
            etags: CategoryETagCache::from_manager(&manager),
        });

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let svc = service.clone();

        tokio::task::spawn(async move {
            let hyper_service = TowerToHyperService::new(svc);

            if let Err(err) = http1::Builder::new()
                .serve_connection(io, hyper_service)
                .await
            {
                tracing::error!(?err, "Error serving connection");
            }
        });
    }
}
