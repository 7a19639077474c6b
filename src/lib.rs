//! Campaign Cache - persistent response cache for the campaign analytics API
//!
//! Provides a TTL cache for GET responses over a persistent key-value medium,
//! a cached HTTP wrapper with cancellation, and explicit invalidation after
//! mutations.

pub mod cache;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod fetch;

pub use cache::{KeyMatch, ResponseCache, SharedCache};
pub use config::Config;
pub use error::{CacheError, FetchError};
pub use fetch::{CacheKey, CacheOptions, CachedFetcher, CachedResponse, RequestOptions};
