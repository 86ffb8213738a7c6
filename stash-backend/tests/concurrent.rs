//! Concurrent access to the shared in-memory backend.

use std::sync::Arc;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use stash_backend::{Backend, CacheBackend, CacheKey, CacheValue, MemoryBackend};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_to_one_key_leave_a_readable_value() {
    let backend = Arc::new(MemoryBackend::new());
    let key = CacheKey::new("/dev/index.html");

    let writers = (0..32u32).map(|writer| {
        let backend = Arc::clone(&backend);
        let key = key.clone();
        tokio::spawn(async move {
            backend
                .set(&key, &CacheValue::new(format!("body-{writer}"), None))
                .await
                .unwrap();
        })
    });
    for joined in join_all(writers).await {
        joined.unwrap();
    }

    let stored = backend.get::<String>(&key).await.unwrap().unwrap();
    assert!(stored.data().starts_with("body-"));
    assert_eq!(backend.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_keys_do_not_interfere() {
    let backend = Arc::new(MemoryBackend::new());

    let writers = (0..16u32).map(|id| {
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            let key = CacheKey::new(format!("/p/{id}"));
            backend.set(&key, &CacheValue::new(id, None)).await.unwrap();
        })
    });
    for joined in join_all(writers).await {
        joined.unwrap();
    }

    for id in 0..16u32 {
        let key = CacheKey::new(format!("/p/{id}"));
        let value = backend.get::<u32>(&key).await.unwrap().unwrap();
        assert_eq!(*value.data(), id);
    }

    backend.clear().await.unwrap();
    assert!(backend.is_empty());
}
