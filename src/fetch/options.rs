//! Request and cache options for the cached fetch wrapper.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use super::key::CacheKey;

// == Request Options ==
/// Transport-level options for one request.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers sent with the request
    pub headers: HeaderMap,
    /// Bearer token, overriding the fetcher's default
    pub bearer_token: Option<String>,
    /// Abort signal; cancelling it aborts the request
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the bearer token.
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Attaches an abort signal.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// True once the attached abort signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

// == Cache Options ==
/// Cache behaviour for one cached GET.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Lifetime of the stored body; None uses the fetcher's default
    pub ttl: Option<Duration>,
    /// Explicit key; None derives `cache:GET:<url>`
    pub cache_key: Option<CacheKey>,
    /// Skip the lookup and always hit the network (the result is still stored)
    pub bypass_cache: bool,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache_key(mut self, key: CacheKey) -> Self {
        self.cache_key = Some(key);
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Shorthand for a forced refresh.
    pub fn refresh() -> Self {
        Self::default().bypass_cache(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::ACCEPT;

    #[test]
    fn test_request_options_builder() {
        let token = CancellationToken::new();
        let options = RequestOptions::new()
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .bearer("abc")
            .with_cancel(token.clone());

        assert_eq!(options.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(options.bearer_token.as_deref(), Some("abc"));
        assert!(!options.is_cancelled());

        token.cancel();
        assert!(options.is_cancelled());
    }

    #[test]
    fn test_no_cancel_is_never_cancelled() {
        assert!(!RequestOptions::default().is_cancelled());
    }

    #[test]
    fn test_refresh_sets_bypass() {
        let options = CacheOptions::refresh();
        assert!(options.bypass_cache);
        assert!(options.ttl.is_none());
        assert!(options.cache_key.is_none());
    }
}
