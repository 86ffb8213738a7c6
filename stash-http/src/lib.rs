//! HTTP side of the stash response cache.
//!
//! - [`CacheRules`] decides which requests are cached and for how long;
//! - [`ResponseCapture`] buffers a downstream response into a
//!   [`CapturedResponse`] without changing what the client receives;
//! - [`CachedResponse`] is the stored snapshot and replays it;
//! - [`PathETagCache`] and [`CategoryETagCache`] back conditional GET.
//!
//! The tower layer tying these together lives in `stash-tower`.
pub mod body;
pub mod capture;
pub mod date;
mod entry;
pub mod etag;
pub mod rules;

pub use body::{CaptureBody, Collected, Remaining};
pub use capture::{Capture, CapturedResponse, DEFAULT_MAX_BODY_SIZE, DoNotCache, ResponseCapture};
pub use entry::CachedResponse;
pub use etag::{CategoryETagCache, PathETagCache, RemoteUser};
pub use rules::{CacheConfig, CacheRules, ROOT};
