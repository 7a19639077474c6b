//! Abort-and-replace for logical fetches.
//!
//! A view that refetches when its filters change owns one [`RequestSlot`].
//! Starting a new fetch cancels the previous one, so a slow stale response can
//! never overwrite newer cache state.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Holds the abort signal of the current in-flight fetch for one resource.
#[derive(Debug, Default)]
pub struct RequestSlot {
    current: Mutex<Option<CancellationToken>>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the previous fetch, if any, and returns the signal for the next.
    pub fn replace(&self) -> CancellationToken {
        let next = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = current.replace(next.clone()) {
            if !previous.is_cancelled() {
                debug!("Aborting superseded request");
            }
            previous.cancel();
        }
        next
    }

    /// Cancels the current fetch without starting another.
    pub fn cancel(&self) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = current.take() {
            token.cancel();
        }
    }
}

impl Drop for RequestSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
