//! Redis cache module
//!
//! Thin wrapper over one shared, auto-reconnecting Redis connection with the
//! commands the services need: plain key/value with TTL, windowed counters and
//! pattern deletes.

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::info;

use crate::error::{CacheError, CacheResult};

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> CacheResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Handle to a single multiplexed Redis connection.
///
/// Clones share the connection; it reconnects on its own after a drop.
#[derive(Clone)]
pub struct RedisPool {
    manager: ConnectionManager,
}

impl RedisPool {
    /// Connect to Redis
    pub async fn new(config: &RedisConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.clone()).map_err(CacheError::Connection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(CacheError::Connection)?;
        info!("Redis connection established with URL: {}", config.url);
        Ok(RedisPool { manager })
    }

    async fn get_connection(&self) -> CacheResult<ConnectionManager> {
        Ok(self.manager.clone())
    }

    /// Set a key-value pair in Redis with optional TTL
    pub async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;

        if let Some(ttl) = ttl_seconds {
            let _: () = conn
                .set_ex(key, value, ttl)
                .await
                .map_err(CacheError::Command)?;
        } else {
            let _: () = conn.set(key, value).await.map_err(CacheError::Command)?;
        }

        Ok(())
    }

    /// Get a value from Redis by key
    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        conn.get(key).await.map_err(CacheError::Command)
    }

    /// Delete a key from Redis
    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(key).await.map_err(CacheError::Command)?;
        Ok(())
    }

    /// Delete exactly the given keys. Returns how many existed.
    pub async fn delete_keys(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_connection().await?;
        conn.del(keys).await.map_err(CacheError::Command)
    }

    /// Increment a counter that lives for one window.
    ///
    /// The key is created with a `window_ms` expiry if it does not exist, then
    /// incremented, inside a single MULTI/EXEC. Returns the post-increment count
    /// and the remaining lifetime of the key in milliseconds.
    pub async fn incr_window(&self, key: &str, window_ms: u64) -> CacheResult<(u64, i64)> {
        let mut conn = self.get_connection().await?;

        let (count, ttl_ms): (u64, i64) = redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(key)
            .arg(0)
            .arg("PX")
            .arg(window_ms)
            .arg("NX")
            .ignore()
            .incr(key, 1)
            .pttl(key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;

        Ok((count, ttl_ms))
    }

    /// Delete every key matching a glob pattern. Returns how many were removed.
    pub async fn delete_matching(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.get_connection().await?;
        let mut cursor: u64 = 0;
        let mut keys: Vec<String> = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(CacheError::Command)?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        if keys.is_empty() {
            return Ok(0);
        }

        conn.del(keys).await.map_err(CacheError::Command)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Command)?;
        Ok(pong == "PONG")
    }
}
