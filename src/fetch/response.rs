//! Responses returned by the cached fetch wrapper.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::key::CacheKey;
use crate::error::FetchResult;

// == Cached Response ==
/// A successful GET, either from the network or synthesized from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    /// HTTP status; always 200 for cache hits
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
    /// Whether the body came from the cache
    pub from_cache: bool,
    /// Key the body is (or would have been) stored under
    pub cache_key: CacheKey,
}

impl CachedResponse {
    /// Synthetic response wrapping a cached body.
    pub(crate) fn from_cache(cache_key: CacheKey, body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            from_cache: true,
            cache_key,
        }
    }

    pub(crate) fn from_network(cache_key: CacheKey, status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            from_cache: false,
            cache_key,
        }
    }

    /// True for 2xx statuses, which is every response that reaches a caller.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Decodes a copy of the body.
    pub fn json<T: DeserializeOwned>(&self) -> FetchResult<T> {
        Ok(T::deserialize(&self.body)?)
    }

    /// Decodes the body, consuming the response.
    pub fn into_json<T: DeserializeOwned>(self) -> FetchResult<T> {
        Ok(serde_json::from_value(self.body)?)
    }
}

// == Api Response ==
/// Typed response for the axios-style helper: `response.data`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub from_cache: bool,
}

impl<T: DeserializeOwned> TryFrom<CachedResponse> for ApiResponse<T> {
    type Error = crate::error::FetchError;

    fn try_from(response: CachedResponse) -> FetchResult<Self> {
        let status = response.status;
        let from_cache = response.from_cache;
        Ok(Self {
            data: response.into_json()?,
            status,
            from_cache,
        })
    }
}
