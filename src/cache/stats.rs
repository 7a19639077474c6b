//! Cache Statistics Module
//!
//! Tracks how often the cache saved a network round trip and how often it
//! had to degrade to "fetch fresh".

use serde::Serialize;

// == Cache Stats ==
/// Counters for one cache instance. Not persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that found nothing usable (absent, expired or corrupted)
    pub misses: u64,
    /// Misses caused by an expired entry
    pub expired: u64,
    /// Corrupted records deleted on read
    pub corrupted_purges: u64,
    /// Successful writes
    pub writes: u64,
    /// Writes skipped because the value or medium refused them
    pub failed_writes: u64,
    /// Entries removed by explicit invalidation
    pub invalidated: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Counts an expired read, which is also a miss.
    pub fn record_expired(&mut self) {
        self.expired += 1;
        self.misses += 1;
    }

    /// Counts a corrupted read, which is also a miss.
    pub fn record_corrupted(&mut self) {
        self.corrupted_purges += 1;
        self.misses += 1;
    }

    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    pub fn record_failed_write(&mut self) {
        self.failed_writes += 1;
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidated += count as u64;
    }
}
