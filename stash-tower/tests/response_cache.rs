//! Handler-driven playback and save through `CacheControl::response_cache`.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use common::{FlakyBackend, Handler, body_of, get};
use http::header::{DATE, EXPIRES};
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use pretty_assertions::assert_eq;
use stash_backend::{Backend, CacheBackend, CacheKey, CacheValue, MemoryBackend};
use stash_http::date::parse_http_date;
use stash_http::{CacheConfig, CacheRules, CachedResponse, Capture, ResponseCapture};
use stash_tower::{CacheControl, DEFAULT_CACHE_STATUS_HEADER};
use tower::{Layer, ServiceExt};

fn text(body: &'static str) -> Response<Full<Bytes>> {
    Response::new(Full::new(Bytes::from_static(body.as_bytes())))
}

fn layer<C: CacheBackend>(backend: Arc<C>) -> CacheControl<C> {
    CacheControl::builder()
        .shared_backend(backend)
        .rules(CacheRules::new().with_config(CacheConfig::subtree("dev", 900)))
        .cache_status_header(DEFAULT_CACHE_STATUS_HEADER)
        .build()
}

#[tokio::test]
async fn saved_response_is_played_back() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = layer(Arc::clone(&backend)).response_cache();
    let request = get("/widgets/list?page=2");

    assert!(
        cache
            .playback::<_, Full<Bytes>>(&request, 30)
            .await
            .is_none()
    );

    let saved = cache.save(&request, 30, text("widgets")).await;
    assert_eq!(saved.headers()[DEFAULT_CACHE_STATUS_HEADER], "MISS");
    let date = parse_http_date(saved.headers()[DATE].to_str().unwrap()).unwrap();
    let expires = parse_http_date(saved.headers()[EXPIRES].to_str().unwrap()).unwrap();
    assert_eq!(expires - date, TimeDelta::seconds(30));
    assert_eq!(body_of(saved).await, Bytes::from_static(b"widgets"));
    assert!(
        backend
            .contains_key(&CacheKey::new("/widgets/list?page=2"))
            .await
            .unwrap()
    );

    let replayed = cache
        .playback::<_, Full<Bytes>>(&request, 30)
        .await
        .unwrap();
    assert_eq!(replayed.status(), StatusCode::OK);
    assert_eq!(replayed.headers()[DEFAULT_CACHE_STATUS_HEADER], "HIT");
    assert_eq!(body_of(replayed).await, Bytes::from_static(b"widgets"));
}

#[tokio::test]
async fn only_get_with_positive_max_age_is_played_back() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = layer(Arc::clone(&backend)).response_cache();
    cache.save(&get("/feed"), 60, text("feed")).await;

    let post = Request::post("/feed").body(()).unwrap();
    assert!(cache.playback::<_, Full<Bytes>>(&post, 60).await.is_none());
    assert!(
        cache
            .playback::<_, Full<Bytes>>(&get("/feed"), 0)
            .await
            .is_none()
    );
    assert!(
        cache
            .playback::<_, Full<Bytes>>(&get("/feed"), 60)
            .await
            .is_some()
    );
}

#[tokio::test]
async fn non_get_save_passes_the_response_through() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = layer(Arc::clone(&backend)).response_cache();
    let post = Request::post("/feed").body(()).unwrap();

    let response = cache.save(&post, 60, text("created")).await;
    assert!(!response.headers().contains_key(EXPIRES));
    assert!(!response.headers().contains_key(DEFAULT_CACHE_STATUS_HEADER));
    assert_eq!(body_of(response).await, Bytes::from_static(b"created"));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn zero_max_age_sets_headers_without_storing() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = layer(Arc::clone(&backend)).response_cache();

    let response = cache.save(&get("/feed"), 0, text("now")).await;
    assert!(response.headers().contains_key(DATE));
    assert!(response.headers().contains_key(EXPIRES));
    assert!(backend.is_empty());
}

#[tokio::test]
async fn stale_entry_is_evicted_on_playback() {
    let backend = Arc::new(FlakyBackend::default());
    let key = CacheKey::new("/feed");
    let stale = {
        let Capture::Complete(captured) = ResponseCapture::default().capture(text("old")).await
        else {
            panic!("small body is captured");
        };
        CachedResponse::new_at(&captured, 10, Utc::now() - TimeDelta::seconds(60))
    };
    backend
        .set(&key, &CacheValue::new(stale, None))
        .await
        .unwrap();

    let cache = layer(Arc::clone(&backend)).response_cache();
    assert!(
        cache
            .playback::<_, Full<Bytes>>(&get("/feed"), 60)
            .await
            .is_none()
    );
    assert_eq!(backend.removals(), 1);
    assert!(!backend.inner.contains_key(&key).await.unwrap());
}

#[tokio::test]
async fn filter_and_handlers_share_entries() {
    let backend = Arc::new(MemoryBackend::new());
    let control = layer(Arc::clone(&backend));
    let cache = control.response_cache();

    let handler = Handler::echo();
    let service = control.layer(handler.clone());
    service.oneshot(get("/dev/page")).await.unwrap();
    assert_eq!(handler.calls(), 1);

    let replayed = cache
        .playback::<_, Full<Bytes>>(&get("/dev/page"), 60)
        .await
        .unwrap();
    assert_eq!(body_of(replayed).await, Bytes::from_static(b"/dev/page"));

    cache
        .save(&get("/dev/saved"), 60, text("from a handler"))
        .await;
    let handler = Handler::echo();
    let response = control
        .layer(handler.clone())
        .oneshot(get("/dev/saved"))
        .await
        .unwrap();
    assert_eq!(handler.calls(), 0);
    assert_eq!(body_of(response).await, Bytes::from_static(b"from a handler"));
}

#[tokio::test]
async fn uncacheable_response_is_not_saved() {
    let backend = Arc::new(MemoryBackend::new());
    let cache = layer(Arc::clone(&backend)).response_cache();
    let mut response = text("gone");
    *response.status_mut() = StatusCode::NOT_FOUND;

    let response = cache.save(&get("/missing"), 60, response).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(backend.is_empty());
}
