use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auth::{
    AppState,
    rate_limiter::{self, RateLimiter, RedisStore},
    repositories::{PgGameStore, PgIdentityProvider},
    routes,
    settings::{RateLimitBackend, Settings},
};
use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting authentication service");

    // A missing or weak signing secret must stop us before anything else
    let settings = Settings::load().context("Invalid service configuration")?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    let rate_limiter = match settings.rate_limit_backend {
        RateLimitBackend::Memory => {
            info!("Using in-memory rate limit store");
            RateLimiter::in_memory()
        }
        RateLimitBackend::Redis => {
            let redis_config = RedisConfig::from_env()?;
            let redis_pool = RedisPool::new(&redis_config).await?;
            if !redis_pool.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }
            info!("Using Redis rate limit store");
            RateLimiter::new(RedisStore::new(redis_pool))
        }
    };

    let _sweeper = rate_limiter::start_sweeper(rate_limiter.clone(), &settings.sweep_schedule)
        .await
        .context("Failed to start rate limit sweeper")?;

    let app_state = AppState::new(
        &settings,
        rate_limiter,
        Arc::new(PgIdentityProvider::new(pool.clone())),
        Arc::new(PgGameStore::new(pool)),
    );

    info!("Authentication service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&settings.bind_address).await?;
    info!("Authentication service listening on {}", settings.bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
