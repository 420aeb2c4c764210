//! Redis-backed sliding-window store.
//!
//! Uses a sorted set per client where members are unique request ids and
//! scores are Unix timestamps in milliseconds. The whole check runs in one
//! Lua script, so concurrent instances see a consistent count.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use super::{RateLimitDecision, RateLimitError, RateLimitPolicy, RateLimitStore};

const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local seq_key = KEYS[2]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])

redis.call('ZREMRANGEBYSCORE', key, '-inf', now_ms - window_ms)
local current = redis.call('ZCARD', key)
local allowed = 0

if current < max_requests then
    redis.call('ZADD', key, now_ms, now_ms .. ':' .. redis.call('INCR', seq_key))
    redis.call('PEXPIRE', key, window_ms)
    redis.call('PEXPIRE', seq_key, window_ms)
    current = current + 1
    allowed = 1
end

local reset_ms = window_ms
local oldest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
if oldest and #oldest >= 2 then
    reset_ms = tonumber(oldest[2]) + window_ms - now_ms
end

return {allowed, current, reset_ms}
"#;

/// Rate-limit store shared by every instance pointing at the same Redis.
#[derive(Clone)]
pub struct RedisStore {
    redis: ConnectionManager,
    key_prefix: String,
    script: Script,
}

impl RedisStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            key_prefix: "rl:api".to_string(),
            script: Script::new(SLIDING_WINDOW_SCRIPT),
        }
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}:{}", self.key_prefix, identifier)
    }

    fn seq_key(&self, identifier: &str) -> String {
        format!("{}:{}:seq", self.key_prefix, identifier)
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn hit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let window_ms = policy.window.as_millis() as i64;
        let mut conn = self.redis.clone();

        let reply: Vec<i64> = self
            .script
            .key(self.key(key))
            .key(self.seq_key(key))
            .arg(now_ms)
            .arg(window_ms)
            .arg(policy.max_requests as i64)
            .invoke_async(&mut conn)
            .await?;

        decision_from_reply(&reply, policy)
    }

    async fn reset(&self, key: &str) -> Result<(), RateLimitError> {
        let keys = vec![self.key(key), self.seq_key(key)];
        let mut conn = self.redis.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }
}

fn decision_from_reply(
    reply: &[i64],
    policy: &RateLimitPolicy,
) -> Result<RateLimitDecision, RateLimitError> {
    let [allowed, current, reset_ms] = reply else {
        return Err(RateLimitError::Protocol(format!(
            "expected 3 integers, got {:?}",
            reply
        )));
    };

    Ok(RateLimitDecision {
        allowed: *allowed == 1,
        limit: policy.max_requests,
        remaining: policy.max_requests.saturating_sub((*current).max(0) as u32),
        reset_after: Duration::from_millis((*reset_ms).max(0) as u64),
    })
}
