//! Response Cache Module
//!
//! TTL cache for GET response bodies over a persistent storage medium.
//! Every fault inside the cache degrades to a miss; nothing here fails a read.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{
    CacheEntry, CacheStats, Clock, FileStorage, KeyMatch, Storage, SystemClock,
    DEFAULT_KEY_PREFIX,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Response Cache ==
/// Cache of response bodies keyed by request signature.
///
/// Only keys that start with the configured prefix belong to the cache. Other
/// records in the same medium (tokens, preferences) are never read, listed or
/// deleted through this type.
pub struct ResponseCache {
    /// Persistent medium
    storage: Box<dyn Storage>,
    /// Time source for TTL checks
    clock: Arc<dyn Clock>,
    /// Namespace prefix every cache key carries
    key_prefix: String,
    /// Performance statistics
    stats: CacheStats,
}

impl ResponseCache {
    // == Constructor ==
    /// Creates a cache over `storage` using the default `cache:` prefix.
    pub fn new(storage: impl Storage + 'static, clock: impl Clock + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            clock: Arc::new(clock),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            stats: CacheStats::new(),
        }
    }

    /// Replaces the namespace prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Opens the file-backed cache described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = FileStorage::open(&config.storage_path, config.quota_bytes)?;
        Ok(Self::new(storage, SystemClock).with_key_prefix(config.key_prefix.clone()))
    }

    /// The namespace prefix every cache key carries.
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn owns(&self, key: &str) -> bool {
        key.starts_with(self.key_prefix.as_str())
    }

    // == Get ==
    /// Returns the stored value if present and unexpired.
    ///
    /// Expired entries are left in place (lazy expiry). Records that are not a
    /// valid envelope are deleted so they do not fail again.
    pub fn get_value(&mut self, key: &str) -> Option<Value> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`get_value`](Self::get_value), decoding into `T`.
    ///
    /// A value that does not decode into `T` is treated as a corrupted record.
    pub fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let entry = self.lookup(key)?;
        match serde_json::from_value(entry.value) {
            Ok(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Err(err) => {
                self.purge_corrupted(key, &err.to_string());
                None
            }
        }
    }

    /// Returns the full envelope for a fresh entry.
    pub fn get_entry(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.lookup(key)?;
        self.stats.record_hit();
        Some(entry)
    }

    /// Finds a fresh entry. Records misses; the caller records the hit.
    fn lookup(&mut self, key: &str) -> Option<CacheEntry> {
        if !self.owns(key) {
            debug!(key, "Ignoring read outside cache namespace");
            self.stats.record_miss();
            return None;
        }

        let raw = match self.storage.get_item(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Cache miss");
                self.stats.record_miss();
                return None;
            }
            Err(err) => {
                warn!(key, error = %err, "Storage read failed, treating as miss");
                self.stats.record_miss();
                return None;
            }
        };

        let entry = match CacheEntry::decode(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                self.purge_corrupted(key, &err.to_string());
                return None;
            }
        };

        let now = self.clock.now_ms();
        if entry.is_expired(now) {
            debug!(key, expired_at = ?entry.expires_at_utc(), "Cache entry expired");
            self.stats.record_expired();
            return None;
        }

        debug!(key, ttl_remaining_ms = entry.ttl_remaining_ms(now), "Cache hit");
        Some(entry)
    }

    fn purge_corrupted(&mut self, key: &str, reason: &str) {
        warn!(key, reason, "Purging corrupted cache record");
        self.stats.record_corrupted();
        if let Err(err) = self.storage.remove_item(key) {
            warn!(key, error = %err, "Failed to purge corrupted cache record");
        }
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, best-effort.
    ///
    /// Failures are logged and leave the store unchanged. Returns whether the
    /// write happened.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T, ttl: Duration) -> bool {
        match self.try_set(key, value, ttl) {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "Cache write skipped");
                self.stats.record_failed_write();
                false
            }
        }
    }

    /// Stores `value` under `key` for `ttl`, reporting why a write failed.
    ///
    /// An existing entry is overwritten and its `storedAt` reset.
    pub fn try_set<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        if !self.owns(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }

        let value = serde_json::to_value(value)?;
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl_ms);
        let raw = entry.encode()?;

        self.storage.set_item(key, &raw)?;
        self.stats.record_write();
        debug!(key, ttl_ms, "Cached response");
        Ok(())
    }

    // == Invalidate ==
    /// Removes every cache entry whose key matches. Returns the number removed.
    pub fn invalidate(&mut self, matcher: impl Into<KeyMatch>) -> usize {
        let matcher = matcher.into();
        let doomed: Vec<String> = self
            .keys()
            .into_iter()
            .filter(|key| matcher.matches(key))
            .collect();

        let mut removed = 0;
        for key in doomed {
            match self.storage.remove_item(&key) {
                Ok(()) => removed += 1,
                Err(err) => warn!(key = %key, error = %err, "Failed to invalidate cache entry"),
            }
        }

        self.stats.record_invalidated(removed);
        info!(?matcher, removed, "Invalidated cache entries");
        removed
    }

    /// Removes exactly one entry. Returns whether it existed.
    pub fn invalidate_key(&mut self, key: &str) -> bool {
        if !self.owns(key) {
            return false;
        }

        let existed = matches!(self.storage.get_item(key), Ok(Some(_)));
        if let Err(err) = self.storage.remove_item(key) {
            warn!(key, error = %err, "Failed to invalidate cache entry");
            return false;
        }

        if existed {
            self.stats.record_invalidated(1);
            debug!(key, "Invalidated cache entry");
        }
        existed
    }

    // == Introspection ==
    /// All keys in the cache namespace, including expired ones.
    pub fn keys(&self) -> Vec<String> {
        self.storage
            .keys()
            .into_iter()
            .filter(|key| self.owns(key))
            .collect()
    }

    /// Number of records in the cache namespace.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns true if the cache namespace holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
