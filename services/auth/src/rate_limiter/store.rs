//! Backing stores for rate-limit counters
//!
//! The limiter only needs an atomic "increment within a window" plus a few
//! maintenance operations, so a single-process map and a shared Redis instance
//! can be swapped without touching callers.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::cache::RedisPool;
use tokio::sync::Mutex;

use super::RateLimitConfig;

/// Counter for one client in one counter space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests seen in the current window
    pub count: u64,
    /// End of the current window
    pub reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn fresh(now: DateTime<Utc>, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at: now + Duration::milliseconds(window_ms as i64),
        }
    }
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Record one request and return the updated entry.
    ///
    /// If the stored window has elapsed (`now > reset_at`) or nothing is
    /// stored, a new window starts with a count of 1. Must be atomic per key.
    async fn hit(
        &self,
        space: &str,
        client_key: &str,
        now: DateTime<Utc>,
        window_ms: u64,
    ) -> Result<RateLimitEntry>;

    /// Forget a client in every counter space. Returns entries removed.
    async fn remove_client(&self, client_key: &str) -> Result<u64>;

    /// Forget everything. Returns entries removed.
    async fn clear(&self) -> Result<u64>;

    /// Drop entries whose window elapsed before `now`. Returns entries removed.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Process-local store; correct only when one process owns all traffic
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<(String, String), RateLimitEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn hit(
        &self,
        space: &str,
        client_key: &str,
        now: DateTime<Utc>,
        window_ms: u64,
    ) -> Result<RateLimitEntry> {
        let mut entries = self.entries.lock().await;
        let key = (space.to_string(), client_key.to_string());

        match entries.get_mut(&key) {
            Some(entry) if now <= entry.reset_at => {
                entry.count += 1;
                Ok(*entry)
            }
            _ => {
                let entry = RateLimitEntry::fresh(now, window_ms);
                entries.insert(key, entry);
                Ok(entry)
            }
        }
    }

    async fn remove_client(&self, client_key: &str) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|(_, client), _| client != client_key);
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    async fn sweep(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now <= entry.reset_at);
        Ok((before - entries.len()) as u64)
    }
}

/// Redis-backed store shared by every instance.
///
/// Keys are `ratelimit:{space}:{client}`. Client keys may themselves contain
/// `:` (IPv6), so per-client removal deletes exact keys in each known space
/// instead of matching a pattern.
#[derive(Clone)]
pub struct RedisStore {
    pool: RedisPool,
    prefix: String,
    spaces: Vec<&'static str>,
}

impl RedisStore {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            prefix: "ratelimit".to_string(),
            spaces: RateLimitConfig::PRESETS.iter().map(|c| c.name).collect(),
        }
    }

    fn key(&self, space: &str, client_key: &str) -> String {
        counter_key(&self.prefix, space, client_key)
    }
}

fn counter_key(prefix: &str, space: &str, client_key: &str) -> String {
    format!("{}:{}:{}", prefix, space, client_key)
}

/// Every key `client_key` can own across `spaces`
fn client_keys(prefix: &str, spaces: &[&str], client_key: &str) -> Vec<String> {
    spaces
        .iter()
        .map(|space| counter_key(prefix, space, client_key))
        .collect()
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn hit(
        &self,
        space: &str,
        client_key: &str,
        now: DateTime<Utc>,
        window_ms: u64,
    ) -> Result<RateLimitEntry> {
        let (count, ttl_ms) = self
            .pool
            .incr_window(&self.key(space, client_key), window_ms)
            .await?;

        Ok(RateLimitEntry {
            count,
            reset_at: now + Duration::milliseconds(ttl_ms.max(0)),
        })
    }

    async fn remove_client(&self, client_key: &str) -> Result<u64> {
        let keys = client_keys(&self.prefix, &self.spaces, client_key);
        Ok(self.pool.delete_keys(&keys).await?)
    }

    async fn clear(&self) -> Result<u64> {
        let pattern = format!("{}:*", self.prefix);
        Ok(self.pool.delete_matching(&pattern).await?)
    }

    async fn sweep(&self, _now: DateTime<Utc>) -> Result<u64> {
        // Counter keys carry a PX expiry, Redis evicts them itself.
        Ok(0)
    }
}
