//! Cache Module
//!
//! Provides a persistent response cache with per-entry TTL and explicit
//! invalidation.

mod clock;
mod entry;
mod key_match;
mod stats;
mod storage;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use key_match::KeyMatch;
pub use stats::CacheStats;
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::ResponseCache;

/// A cache handle shared by every collaborator in the process.
pub type SharedCache = Arc<RwLock<ResponseCache>>;

// == Public Constants ==
/// Namespace prefix carried by every cache key
pub const DEFAULT_KEY_PREFIX: &str = "cache:";

/// Wraps a cache for sharing across tasks.
pub fn shared(cache: ResponseCache) -> SharedCache {
    Arc::new(RwLock::new(cache))
}
