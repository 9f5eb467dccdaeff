//! Fixed-window rate limiting per client and route class
//!
//! Each route class has its own counter space and ceiling. A client's window
//! starts on its first request and resets wholesale once it elapses, so a
//! client can land up to twice the ceiling across a window boundary.

mod store;

pub use store::{MemoryStore, RateLimitEntry, RateLimitStore, RedisStore};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Key used when no client address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Ceiling for one route class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Counter space; route classes never share counters
    pub name: &'static str,
    /// Requests allowed per window
    pub max_requests: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitConfig {
    /// Sign-in, sign-up and other credential endpoints
    pub const AUTH: Self = Self {
        name: "auth",
        max_requests: 5,
        window_ms: 15 * 60 * 1000,
    };

    /// Password-reset emails
    pub const PASSWORD_RESET: Self = Self {
        name: "password-reset",
        max_requests: 3,
        window_ms: 60 * 60 * 1000,
    };

    /// Score submission
    pub const SCORE_SUBMISSION: Self = Self {
        name: "score-submission",
        max_requests: 10,
        window_ms: 60 * 1000,
    };

    /// Everything else
    pub const GENERAL: Self = Self {
        name: "general",
        max_requests: 100,
        window_ms: 60 * 1000,
    };

    /// Every route class the service mounts
    pub const PRESETS: [Self; 4] = [
        Self::AUTH,
        Self::PASSWORD_RESET,
        Self::SCORE_SUBMISSION,
        Self::GENERAL,
    ];
}

/// Derive the counter key for a request.
///
/// First address of `x-forwarded-for`, then `x-real-ip`, then the socket peer,
/// then [`UNKNOWN_CLIENT`].
pub fn client_key(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(forwarded) = forwarded {
        return forwarded.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(real_ip) = real_ip {
        return real_ip.to_string();
    }

    remote_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// 429 response for a client over its ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRejection {
    pub limit: u64,
    pub reset_at: DateTime<Utc>,
    /// Whole seconds until `reset_at`, at least 1
    pub retry_after_secs: u64,
}

impl RateLimitRejection {
    fn new(config: &RateLimitConfig, entry: &RateLimitEntry, now: DateTime<Utc>) -> Self {
        let remaining_ms = (entry.reset_at - now).num_milliseconds().max(0) as u64;
        let retry_after_secs = remaining_ms.div_ceil(1000).max(1);

        Self {
            limit: config.max_requests,
            reset_at: entry.reset_at,
            retry_after_secs,
        }
    }
}

impl IntoResponse for RateLimitRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": "Too many requests",
            "message": format!(
                "Too many requests. Please try again in {} seconds.",
                self.retry_after_secs
            ),
        }));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
        let headers = response.headers_mut();
        headers.insert(RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(0u64));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from(self.reset_at.timestamp()),
        );

        response
    }
}

/// Rate limiter shared by every route class
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(store: impl RateLimitStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Limiter backed by a process-local map
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Count a request from `client_key` against `config`.
    ///
    /// Returns `None` when the request is allowed. Store failures are logged
    /// and the request is allowed; this method never fails.
    pub async fn check(
        &self,
        client_key: &str,
        config: &RateLimitConfig,
    ) -> Option<RateLimitRejection> {
        self.check_at(client_key, config, Utc::now()).await
    }

    pub(crate) async fn check_at(
        &self,
        client_key: &str,
        config: &RateLimitConfig,
        now: DateTime<Utc>,
    ) -> Option<RateLimitRejection> {
        let entry = match self
            .store
            .hit(config.name, client_key, now, config.window_ms)
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                error!(space = config.name, "Rate limit store failed: {}", e);
                return None;
            }
        };

        if entry.count <= config.max_requests {
            return None;
        }

        let rejection = RateLimitRejection::new(config, &entry, now);
        warn!(
            space = config.name,
            client = client_key,
            count = entry.count,
            retry_after = rejection.retry_after_secs,
            "Rate limit exceeded"
        );

        Some(rejection)
    }

    /// Reset a client in every counter space
    pub async fn clear(&self, client_key: &str) {
        if let Err(e) = self.store.remove_client(client_key).await {
            error!("Failed to clear rate limit for {}: {}", client_key, e);
        }
    }

    /// Reset every counter
    pub async fn clear_all(&self) {
        if let Err(e) = self.store.clear().await {
            error!("Failed to clear rate limits: {}", e);
        }
    }

    /// Evict entries whose window has elapsed. Returns how many were dropped.
    pub async fn sweep(&self) -> u64 {
        match self.store.sweep(Utc::now()).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Rate limit sweep failed: {}", e);
                0
            }
        }
    }
}

/// Schedule the periodic sweep. Keep the returned scheduler alive.
pub async fn start_sweeper(limiter: RateLimiter, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(schedule, move |_, _| {
        let limiter = limiter.clone();
        Box::pin(async move {
            let removed = limiter.sweep().await;
            info!("Rate limit sweep removed {} expired entries", removed);
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("Started rate limit sweeper with schedule: {}", schedule);
    Ok(scheduler)
}
