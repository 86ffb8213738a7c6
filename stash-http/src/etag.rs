//! ETag caches for conditional GET.
//!
//! Two stores remember the entity tag last handed to a user:
//!
//! - [`PathETagCache`] keys tags by user and path;
//! - [`CategoryETagCache`] keys tags by user and an application-chosen
//!   category, so that one tag covers a family of dynamic resources and can
//!   be invalidated when the user's data changes.
//!
//! A tag lives until it is invalidated. Handlers call `record_response`
//! when producing a representation and check the client's `If-None-Match`
//! before doing the work.

use std::sync::Arc;

use chrono::Utc;
use http::header::{ETAG, IF_NONE_MATCH};
use http::{HeaderValue, Request, Response, StatusCode};
use sha1::{Digest, Sha1};
use smol_str::SmolStr;
use stash_backend::{BackendResult, CacheBackend, CacheManager};
use stash_core::{CacheKey, CacheScope, CacheValue};

/// Name of the user the authentication layer resolved for a request.
///
/// Stored as a request extension. Requests without it belong to
/// [`RemoteUser::ANONYMOUS`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteUser(SmolStr);

impl RemoteUser {
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn new(user: impl Into<SmolStr>) -> Self {
        Self(user.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The user of `request`.
    pub fn of<B>(request: &Request<B>) -> &str {
        request
            .extensions()
            .get::<RemoteUser>()
            .map_or(Self::ANONYMOUS, RemoteUser::as_str)
    }
}

fn nanos() -> i64 {
    Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// Entity tags per user and path.
#[derive(Debug)]
pub struct PathETagCache<C> {
    cache: Arc<C>,
}

impl<C> Clone for PathETagCache<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C> PathETagCache<C>
where
    C: CacheBackend,
{
    pub const CACHE_NAME: &'static str = "stash.etag.path";

    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Uses the instance-scoped cache [`Self::CACHE_NAME`] of `manager`.
    pub fn from_manager<M>(manager: &M) -> Self
    where
        M: CacheManager<Cache = C>,
    {
        Self::new(manager.cache(Self::CACHE_NAME, CacheScope::Instance))
    }

    fn key<B>(request: &Request<B>) -> CacheKey {
        CacheKey::for_user_path(RemoteUser::of(request), request.uri().path())
    }

    /// Remembers a tag for this user and path unless one already exists.
    pub async fn record_response<B>(&self, request: &Request<B>) -> BackendResult<()> {
        let key = Self::key(request);
        if self.cache.contains_key(&key).await? {
            return Ok(());
        }
        let etag = format!("{}-{}-{}", RemoteUser::of(request), request.uri().path(), nanos());
        tracing::debug!(cache.key = %key, %etag, "recording path etag");
        self.cache.set(&key, &CacheValue::new(etag, None)).await
    }

    pub async fn etag<B>(&self, request: &Request<B>) -> BackendResult<Option<String>> {
        Ok(self
            .cache
            .get::<String>(&Self::key(request))
            .await?
            .map(CacheValue::into_inner))
    }

    pub async fn invalidate<B>(&self, request: &Request<B>) -> BackendResult<()> {
        self.cache.delete(&Self::key(request)).await?;
        Ok(())
    }
}

/// Entity tags per user and category.
#[derive(Debug)]
pub struct CategoryETagCache<C> {
    cache: Arc<C>,
}

impl<C> Clone for CategoryETagCache<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C> CategoryETagCache<C>
where
    C: CacheBackend,
{
    pub const CACHE_NAME: &'static str = "stash.etag.category";

    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Uses the instance-scoped cache [`Self::CACHE_NAME`] of `manager`.
    pub fn from_manager<M>(manager: &M) -> Self
    where
        M: CacheManager<Cache = C>,
    {
        Self::new(manager.cache(Self::CACHE_NAME, CacheScope::Instance))
    }

    async fn stored(&self, key: &CacheKey) -> BackendResult<Option<String>> {
        Ok(self
            .cache
            .get::<String>(key)
            .await?
            .map(CacheValue::into_inner))
    }

    /// Sets the `ETag` header of `response` to the user's tag for
    /// `category`, creating the tag first if there is none.
    pub async fn record_response<B, R>(
        &self,
        category: &str,
        request: &Request<B>,
        response: &mut Response<R>,
    ) -> BackendResult<()> {
        let key = CacheKey::for_user_category(RemoteUser::of(request), category);
        let etag = match self.stored(&key).await? {
            Some(etag) => etag,
            None => {
                let etag = new_etag(request);
                tracing::debug!(cache.key = %key, %etag, "recording category etag");
                self.cache.set(&key, &CacheValue::new(etag.clone(), None)).await?;
                etag
            }
        };
        // Hex digests are always valid header values.
        if let Ok(value) = HeaderValue::from_str(&etag) {
            response.headers_mut().insert(ETAG, value);
        }
        Ok(())
    }

    /// Whether the client's `If-None-Match` equals the user's tag for
    /// `category`. On a match `response` becomes `304 Not Modified`;
    /// otherwise it is left untouched.
    pub async fn client_has_fresh_etag<B, R>(
        &self,
        category: &str,
        request: &Request<B>,
        response: &mut Response<R>,
    ) -> BackendResult<bool> {
        let Some(client) = request.headers().get(IF_NONE_MATCH) else {
            return Ok(false);
        };
        let key = CacheKey::for_user_category(RemoteUser::of(request), category);
        match self.stored(&key).await? {
            Some(server) if client.as_bytes() == server.as_bytes() => {
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Drops the tag of `user_id` for `category`.
    pub async fn invalidate(&self, category: &str, user_id: &str) -> BackendResult<()> {
        self.cache
            .delete(&CacheKey::for_user_category(user_id, category))
            .await?;
        Ok(())
    }
}

fn new_etag<B>(request: &Request<B>) -> String {
    let raw = format!(
        "{}:{}:{}:{}",
        RemoteUser::of(request),
        request.uri().path(),
        request.uri().query().unwrap_or_default(),
        nanos()
    );
    hex::encode(Sha1::digest(raw.as_bytes()))
}
