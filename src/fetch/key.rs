//! Cache Key Module
//!
//! Deterministic cache keys derived from request identity:
//! `<prefix><METHOD>:<full url>`, e.g. `cache:GET:https://host/path?a=1&b=2`.
//! The query string is kept exactly as constructed, so parameter order is part
//! of the identity.

use std::fmt;

use reqwest::{Method, Url};

use crate::cache::KeyMatch;
use crate::error::{FetchError, FetchResult};

/// Query parameter used by the force-refresh convention.
pub const CACHE_BUSTER_PARAM: &str = "_";

// == Cache Key ==
/// A cache key for one request signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for `method` on `url`.
    pub fn new(prefix: &str, method: &Method, url: &Url) -> Self {
        Self(format!("{}{}:{}", prefix, method.as_str(), url))
    }

    /// Derives the key for a GET of `url`.
    pub fn for_get(prefix: &str, url: &Url) -> Self {
        Self::new(prefix, &Method::GET, url)
    }

    /// Wraps a caller-supplied key verbatim.
    pub fn from_raw(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&CacheKey> for KeyMatch {
    fn from(key: &CacheKey) -> Self {
        KeyMatch::Exact(key.0.clone())
    }
}

impl From<CacheKey> for KeyMatch {
    fn from(key: CacheKey) -> Self {
        KeyMatch::Exact(key.0)
    }
}

// == URL Construction ==
/// Joins `path` onto `base` and appends `params` in the given order.
///
/// Parameters with empty values are kept; filter them before calling if they
/// should be omitted.
pub fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> FetchResult<Url> {
    let base = Url::parse(base).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base, e)))?;
    let mut url = base
        .join(path)
        .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", path, e)))?;

    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter().copied());
    }
    Ok(url)
}

/// Returns `url` with a volatile `_=<ts>` parameter appended.
///
/// The result never collides with the key of the original URL.
pub fn with_cache_buster(url: &Url, timestamp_ms: u64) -> Url {
    let mut busted = url.clone();
    busted
        .query_pairs_mut()
        .append_pair(CACHE_BUSTER_PARAM, &timestamp_ms.to_string());
    busted
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BASE: &str = "https://react-api-script.onrender.com";

    #[test]
    fn test_key_format() {
        let url = build_url(BASE, "/mamaearth/campaign", &[("platform", "Zepto")]).unwrap();
        let key = CacheKey::for_get("cache:", &url);

        assert_eq!(
            key.as_str(),
            "cache:GET:https://react-api-script.onrender.com/mamaearth/campaign?platform=Zepto"
        );
        assert_eq!(key.to_string(), key.as_str());
    }

    #[test]
    fn test_method_is_part_of_key() {
        let url = build_url(BASE, "/mamaearth/campaign", &[]).unwrap();
        assert_ne!(
            CacheKey::new("cache:", &Method::GET, &url),
            CacheKey::new("cache:", &Method::PUT, &url)
        );
    }

    #[test]
    fn test_no_params_no_question_mark() {
        let url = build_url(BASE, "/mamaearth/displayrules", &[]).unwrap();
        assert_eq!(url.as_str(), "https://react-api-script.onrender.com/mamaearth/displayrules");
    }

    #[test]
    fn test_params_are_encoded() {
        let url = build_url(BASE, "/mamaearth/campaign", &[("brand_name", "Dr. Sheth's & Co")])
            .unwrap();
        assert_eq!(url.query(), Some("brand_name=Dr.+Sheth%27s+%26+Co"));
    }

    #[test]
    fn test_cache_buster_produces_fresh_key() {
        let url = build_url(BASE, "/mamaearth/campaign", &[("platform", "Blinkit")]).unwrap();
        let busted = with_cache_buster(&url, 1_717_171_717_000);

        assert_eq!(busted.query(), Some("platform=Blinkit&_=1717171717000"));
        assert_ne!(CacheKey::for_get("cache:", &url), CacheKey::for_get("cache:", &busted));
    }

    #[test]
    fn test_invalid_base() {
        let result = build_url("not a url", "/x", &[]);
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn test_key_converts_to_exact_match() {
        let key = CacheKey::from_raw("cache:GET:/a");
        let matcher: KeyMatch = (&key).into();
        assert!(matcher.matches("cache:GET:/a"));
        assert!(!matcher.matches("cache:GET:/a?b=1"));
    }

    fn params_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[a-z_]{1,10}", "[a-zA-Z0-9 -]{0,12}"), 0..6)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        // Identical requests always produce identical keys.
        #[test]
        fn prop_identical_requests_same_key(params in params_strategy()) {
            let pairs: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

            let a = build_url(BASE, "/mamaearth/keywords", &pairs).unwrap();
            let b = build_url(BASE, "/mamaearth/keywords", &pairs).unwrap();

            prop_assert_eq!(CacheKey::for_get("cache:", &a), CacheKey::for_get("cache:", &b));
        }

        // Changing any parameter value changes the key.
        #[test]
        fn prop_different_params_different_key(
            params in params_strategy(),
            name in "[a-z_]{1,10}",
            left in "[a-zA-Z0-9]{1,12}",
            right in "[a-zA-Z0-9]{1,12}",
        ) {
            prop_assume!(left != right);

            let mut with_left: Vec<(&str, &str)> =
                params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let mut with_right = with_left.clone();
            with_left.push((name.as_str(), left.as_str()));
            with_right.push((name.as_str(), right.as_str()));

            let a = build_url(BASE, "/mamaearth/keywords", &with_left).unwrap();
            let b = build_url(BASE, "/mamaearth/keywords", &with_right).unwrap();

            prop_assert_ne!(CacheKey::for_get("cache:", &a), CacheKey::for_get("cache:", &b));
        }
    }
}
