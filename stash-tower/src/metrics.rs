//! Counter names, described once on first use.

use lazy_static::lazy_static;

lazy_static! {
    /// Requests answered from the cache.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_cache_hit_total",
            "Total number of requests answered from the cache."
        );
        "stash_cache_hit_total"
    };
    /// Responses written to the cache.
    pub static ref CACHE_SAVE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_cache_save_total",
            "Total number of responses stored in the cache."
        );
        "stash_cache_save_total"
    };
    /// Cacheable requests that had to reach the handler.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_cache_miss_total",
            "Total number of cacheable requests forwarded to the handler."
        );
        "stash_cache_miss_total"
    };
    /// Requests outside every caching policy.
    pub static ref CACHE_BYPASS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_cache_bypass_total",
            "Total number of requests passed through without caching."
        );
        "stash_cache_bypass_total"
    };
    /// Responses replayed through [`ResponseCache::playback`](crate::ResponseCache::playback).
    pub static ref RESPONSE_CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_response_cache_hit_total",
            "Total number of responses replayed by handlers from the cache."
        );
        "stash_response_cache_hit_total"
    };
    /// Responses stored through [`ResponseCache::save`](crate::ResponseCache::save).
    pub static ref RESPONSE_CACHE_SAVE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "stash_response_cache_save_total",
            "Total number of responses stored by handlers in the cache."
        );
        "stash_response_cache_save_total"
    };
}
