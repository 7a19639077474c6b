//! Key Matching Module
//!
//! Selects which cache entries an invalidation removes.

use std::fmt;
use std::sync::Arc;

/// Selector for [`ResponseCache::invalidate`](super::ResponseCache::invalidate).
///
/// Plain strings convert to [`KeyMatch::Contains`], so passing a resource path
/// such as `"/mamaearth/campaign"` drops every cached request for it.
#[derive(Clone)]
pub enum KeyMatch {
    /// Exactly this key
    Exact(String),
    /// Keys starting with this string (matched against the full key)
    Prefix(String),
    /// Keys containing this string anywhere
    Contains(String),
    /// Keys for which the predicate returns true
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl KeyMatch {
    /// Builds a predicate matcher.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        KeyMatch::Predicate(Arc::new(f))
    }

    /// Tests a single key.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyMatch::Exact(k) => key == k,
            KeyMatch::Prefix(p) => key.starts_with(p.as_str()),
            KeyMatch::Contains(s) => key.contains(s.as_str()),
            KeyMatch::Predicate(f) => f(key),
        }
    }
}

impl fmt::Debug for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyMatch::Exact(k) => f.debug_tuple("Exact").field(k).finish(),
            KeyMatch::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            KeyMatch::Contains(s) => f.debug_tuple("Contains").field(s).finish(),
            KeyMatch::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for KeyMatch {
    fn from(fragment: &str) -> Self {
        KeyMatch::Contains(fragment.to_string())
    }
}

impl From<String> for KeyMatch {
    fn from(fragment: String) -> Self {
        KeyMatch::Contains(fragment)
    }
}
