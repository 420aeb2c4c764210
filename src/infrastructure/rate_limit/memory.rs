//! In-process sliding-window store.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{RateLimitDecision, RateLimitError, RateLimitPolicy, RateLimitStore};

/// Per-key request log held in a sharded map.
///
/// Each key owns at most `max_requests` instants, so memory per client is
/// bounded. Keys whose newest entry has left the window are dropped by
/// [`MemoryStore::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, VecDeque<Instant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request at `now`. The shard lock for `key` is held for the
    /// whole read-modify-write, so concurrent hits on one key serialize.
    pub fn hit_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        let mut log = self.entries.entry(key.to_owned()).or_default();

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= policy.window {
                log.pop_front();
            } else {
                break;
            }
        }

        let used = log.len() as u32;
        let allowed = used < policy.max_requests;
        if allowed {
            log.push_back(now);
        }

        let reset_after = log
            .front()
            .map(|&oldest| policy.window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(policy.window);

        RateLimitDecision {
            allowed,
            limit: policy.max_requests,
            remaining: policy.max_requests.saturating_sub(log.len() as u32),
            reset_after,
        }
    }

    /// Drop keys with no request inside `window` as of `now`.
    pub fn purge_expired(&self, window: Duration, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, log| {
            log.back()
                .is_some_and(|&newest| now.saturating_duration_since(newest) < window)
        });
        before.saturating_sub(self.entries.len())
    }

    /// Periodically purge idle keys until the runtime shuts down.
    pub fn spawn_sweeper(self: Arc<Self>, window: Duration, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let purged = self.purge_expired(window, Instant::now());
                if purged > 0 {
                    tracing::debug!(purged, tracked = self.len(), "Rate limit keys purged");
                }
            }
        })
    }

    /// Number of tracked client keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.hit_at(key, policy, Instant::now()))
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        self.entries.remove(key);
        Ok(())
    }
}
