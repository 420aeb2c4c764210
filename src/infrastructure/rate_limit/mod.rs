//! Rate-limit counter stores.
//!
//! Counters are a per-client log of request instants over a rolling window.
//! [`MemoryStore`] keeps them in process memory and is only correct for a
//! single instance; [`RedisStore`] shares them across instances.

mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Limit applied to every client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed within one window
    pub max_requests: u32,
    /// Rolling window length
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// Outcome of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the oldest counted request leaves the window
    pub reset_after: Duration,
}

impl RateLimitDecision {
    /// Seconds a rejected client should wait, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("rate limit store returned an unexpected reply: {0}")]
    Protocol(String),
}

/// Counter backend shared by all in-flight requests.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record a request for `key` and decide whether it is admitted.
    /// Rejected requests are not counted.
    async fn hit(&self, key: &str, policy: &RateLimitPolicy)
        -> Result<RateLimitDecision, RateLimitError>;

    /// Forget everything recorded for `key`.
    async fn reset(&self, key: &str) -> Result<(), RateLimitError>;
}
