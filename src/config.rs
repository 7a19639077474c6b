//! Configuration Module
//!
//! Handles loading cache and client configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_KEY_PREFIX;

/// Default TTL for cached responses: 5 minutes.
pub const DEFAULT_TTL_MS: u64 = 5 * 60 * 1000;

/// Default storage quota, matching the usual browser storage limit.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Default remote API origin.
pub const DEFAULT_API_BASE_URL: &str = "https://react-api-script.onrender.com";

/// Cache and client configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// File backing the persistent cache
    pub storage_path: PathBuf,
    /// Namespace prefix for cache keys
    pub key_prefix: String,
    /// TTL used when a caller does not pick one
    pub default_ttl: Duration,
    /// Byte quota for the storage medium, None = unlimited
    pub quota_bytes: Option<usize>,
    /// Origin of the remote API
    pub api_base_url: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
    /// Upper bound on a single request, None = unbounded
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_STORAGE_PATH` - Storage file (default: campaign_cache.json)
    /// - `CACHE_KEY_PREFIX` - Key namespace (default: cache:)
    /// - `CACHE_DEFAULT_TTL_MS` - Default TTL in milliseconds (default: 300000)
    /// - `CACHE_QUOTA_BYTES` - Storage quota, 0 disables it (default: 5 MiB)
    /// - `API_BASE_URL` - Remote API origin
    /// - `API_ACCESS_TOKEN` - Bearer token (default: none)
    /// - `REQUEST_TIMEOUT_MS` - Per-request timeout (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            storage_path: env::var("CACHE_STORAGE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            key_prefix: env::var("CACHE_KEY_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.key_prefix),
            default_ttl: env::var("CACHE_DEFAULT_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.default_ttl),
            quota_bytes: match env::var("CACHE_QUOTA_BYTES").ok().and_then(|v| v.parse().ok()) {
                Some(0) => None,
                Some(bytes) => Some(bytes),
                None => defaults.quota_bytes,
            },
            api_base_url: env::var("API_BASE_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_base_url),
            access_token: env::var("API_ACCESS_TOKEN").ok().filter(|v| !v.is_empty()),
            request_timeout: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("campaign_cache.json"),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: Duration::from_millis(DEFAULT_TTL_MS),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
            request_timeout: None,
        }
    }
}
