//! Error types for the response cache
//!
//! Provides unified error handling using thiserror. Cache faults never reach
//! callers of the read/write primitives; transport faults always do.

use reqwest::StatusCode;
use thiserror::Error;

// == Cache Error Enum ==
/// Faults raised by the persistent storage medium or by envelope encoding.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Writing the record would exceed the storage quota
    #[error("Storage quota exceeded: need {needed} bytes, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The value or envelope could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from a file-backed medium
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Key does not carry the cache namespace prefix
    #[error("Key outside cache namespace: {0}")]
    InvalidKey(String),
}

// == Fetch Error Enum ==
/// Faults raised while talking to the remote API.
///
/// These are propagated to callers unchanged and are never cached.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network or protocol failure reported by the HTTP client
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// The caller cancelled the request before it completed
    #[error("Request aborted")]
    Aborted,

    /// The request URL could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The body did not match the type the caller asked for
    #[error("Could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A read-only method was passed to the mutation path
    #[error("{0} is not a mutating method")]
    NotMutation(reqwest::Method),
}

impl FetchError {
    /// Returns true if this error came from cancellation rather than the network.
    pub fn is_aborted(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }

    /// Returns the HTTP status for non-2xx responses.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

// == Result Type Aliases ==
/// Convenience Result type for storage operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Convenience Result type for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
