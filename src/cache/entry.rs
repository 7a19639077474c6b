//! Cache Entry Module
//!
//! Defines the envelope persisted for every cached response body.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Cache Entry ==
/// A cached response body with its freshness metadata.
///
/// Persisted as `{ "value": ..., "storedAt": ..., "ttlMs": ... }`, one record
/// per cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// The deserialized response body
    pub value: Value,
    /// Insertion timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stored at `now_ms`.
    pub fn new(value: Value, now_ms: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            stored_at: now_ms,
            ttl_ms,
        }
    }

    /// Expiration timestamp (Unix milliseconds).
    pub fn expires_at(&self) -> u64 {
        self.stored_at.saturating_add(self.ttl_ms)
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// An entry is valid only while `now < expires_at`, so it expires the
    /// instant the TTL has fully elapsed. A zero TTL is never valid.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at()
    }

    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at().saturating_sub(now_ms)
    }

    /// Expiration time as a UTC datetime, for log output.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.expires_at()).ok()?)
    }

    // == Encoding ==
    /// Encodes the envelope for the storage medium.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes a stored record. Fails on anything that is not a full envelope.
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
