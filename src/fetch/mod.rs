//! Fetch Module
//!
//! Cached GET wrapper, cache-key construction and request cancellation.

mod abort;
mod client;
mod key;
mod options;
mod response;

pub use abort::RequestSlot;
pub use client::CachedFetcher;
pub use key::{build_url, with_cache_buster, CacheKey, CACHE_BUSTER_PARAM};
pub use options::{CacheOptions, RequestOptions};
pub use response::{ApiResponse, CachedResponse};
