//! Cached HTTP client.
//!
//! Composes the shared [`ResponseCache`](crate::cache::ResponseCache) with
//! reqwest: at most one network call per key per TTL for GETs, no caching and
//! explicit invalidation for mutations.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::key::{build_url, CacheKey};
use super::options::{CacheOptions, RequestOptions};
use super::response::{ApiResponse, CachedResponse};
use crate::cache::{KeyMatch, SharedCache};
use crate::config::Config;
use crate::error::{FetchError, FetchResult};

/// HTTP client that reads through the response cache.
#[derive(Clone)]
pub struct CachedFetcher {
    client: Client,
    cache: SharedCache,
    key_prefix: String,
    default_ttl: Duration,
    base_url: String,
    access_token: Option<String>,
}

impl CachedFetcher {
    /// Builds a fetcher over `cache` using the configured origin, token and timeout.
    pub fn new(cache: SharedCache, config: &Config) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("campaign-cache"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            cache,
            key_prefix: config.key_prefix.clone(),
            default_ttl: config.default_ttl,
            base_url: config.api_base_url.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// The cache this fetcher reads through.
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Builds a URL on the configured origin. Parameter order is preserved.
    pub fn url(&self, path: &str, params: &[(&str, &str)]) -> FetchResult<Url> {
        build_url(&self.base_url, path, params)
    }

    /// The key a GET of `url` is cached under.
    pub fn key_for(&self, url: &Url) -> CacheKey {
        CacheKey::for_get(&self.key_prefix, url)
    }

    // == Cached GET ==
    /// GETs `url` through the cache.
    ///
    /// Without `bypass_cache`, a fresh entry is returned as a synthetic 200
    /// and no request is made. Otherwise the request is sent and a 2xx body is
    /// stored before returning. Transport errors, non-2xx statuses and aborts
    /// propagate unchanged and never touch the cache.
    pub async fn fetch(
        &self,
        url: &Url,
        request: &RequestOptions,
        options: CacheOptions,
    ) -> FetchResult<CachedResponse> {
        let key = options.cache_key.unwrap_or_else(|| self.key_for(url));
        let ttl = options.ttl.unwrap_or(self.default_ttl);

        if options.bypass_cache {
            debug!(key = %key, "Bypassing cache");
        } else {
            let cached = self.cache.write().await.get_value(key.as_str());
            if let Some(body) = cached {
                return Ok(CachedResponse::from_cache(key, body));
            }
        }

        let cancel = request.cancel.as_ref();
        let builder = self.request(Method::GET, url, request);

        info!(url = %url, "Fetching from network");
        let (status, body) = abortable(cancel, async {
            let response = check_response(builder.send().await?).await?;
            let status = response.status();
            Ok::<_, FetchError>((status, read_json(response).await?))
        })
        .await?;

        // Checked under the write guard: an abort that lands while waiting
        // for the lock still leaves the attempt uncached.
        let mut cache = self.cache.write().await;
        if request.is_cancelled() {
            debug!(key = %key, "Request aborted after response, not caching");
            return Err(FetchError::Aborted);
        }
        cache.set(key.as_str(), &body, ttl);
        drop(cache);

        Ok(CachedResponse::from_network(key, status, body))
    }

    /// Axios-style GET: the body decoded into `T` as `response.data`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &Url,
        request: &RequestOptions,
        options: CacheOptions,
    ) -> FetchResult<ApiResponse<T>> {
        self.fetch(url, request, options).await?.try_into()
    }

    // == Mutations ==
    /// Sends a PUT/POST/PATCH/DELETE and then invalidates every matcher.
    ///
    /// Invalidation runs whether or not the request succeeded, since a failed
    /// or aborted mutation may still have reached the backend.
    pub async fn mutate(
        &self,
        method: Method,
        url: &Url,
        request: &RequestOptions,
        body: Option<&Value>,
        invalidates: &[KeyMatch],
    ) -> FetchResult<Value> {
        if method.is_safe() {
            return Err(FetchError::NotMutation(method));
        }

        let mut builder = self.request(method.clone(), url, request);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        info!(%method, url = %url, "Sending mutation");
        let result = abortable(request.cancel.as_ref(), async {
            let response = check_response(builder.send().await?).await?;
            read_json(response).await
        })
        .await;

        if let Err(err) = &result {
            warn!(%method, url = %url, error = %err, "Mutation failed");
        }

        let mut cache = self.cache.write().await;
        for matcher in invalidates {
            cache.invalidate(matcher.clone());
        }

        result
    }

    /// Removes every cached entry matching `matcher`.
    pub async fn invalidate(&self, matcher: impl Into<KeyMatch>) -> usize {
        self.cache.write().await.invalidate(matcher)
    }

    /// Removes the cached entry for one key.
    pub async fn invalidate_key(&self, key: &CacheKey) -> bool {
        self.cache.write().await.invalidate_key(key.as_str())
    }

    fn request(&self, method: Method, url: &Url, options: &RequestOptions) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url.clone())
            .headers(options.headers.clone());

        let token = options
            .bearer_token
            .as_deref()
            .or(self.access_token.as_deref());
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

/// Runs `fut` unless `cancel` fires first.
async fn abortable<T>(
    cancel: Option<&CancellationToken>,
    fut: impl Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Aborted),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

/// Converts non-2xx responses into errors.
async fn check_response(response: Response) -> FetchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status { status, url, body })
}

/// Reads a JSON body; an empty body reads as null.
async fn read_json(response: Response) -> FetchResult<Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
