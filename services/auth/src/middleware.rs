//! Request-edge middleware: rate limiting and CSRF
//!
//! Mounted per route group with `route_layer`, rate limiting outermost, so a
//! request is counted before its CSRF token is looked at.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    csrf,
    rate_limiter::{self, RateLimitConfig, RateLimiter},
};

/// Reject callers over the ceiling of the route class in `config`
pub async fn rate_limit_middleware(
    State((limiter, config)): State<(RateLimiter, RateLimitConfig)>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = rate_limiter::client_key(req.headers(), remote_addr);

    if let Some(rejection) = limiter.check(&key, &config).await {
        return rejection.into_response();
    }

    next.run(req).await
}

/// Reject mutating requests without a matching CSRF cookie and header
pub async fn csrf_middleware(req: Request<Body>, next: Next) -> Response {
    if let Some(rejection) = csrf::guard(&req) {
        return rejection.into_response();
    }

    next.run(req).await
}
