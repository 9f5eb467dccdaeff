//! Session cookie transport and request extractors
//!
//! The cookie is `SameSite=Lax` rather than `Strict` so a signed-in player
//! following a link from another site still arrives signed in. State-changing
//! requests are covered by the CSRF guard regardless.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::{
    error::ApiError,
    jwt::SESSION_TTL_DAYS,
    models::SessionData,
    state::AppState,
};

/// Cookie carrying the signed session credential
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Write a credential into the response cookies
pub fn attach_to_response(jar: CookieJar, credential: String, secure: bool) -> CookieJar {
    let cookie = Cookie::build((SESSION_COOKIE_NAME, credential))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build();

    jar.add(cookie)
}

/// Read the raw credential from the request cookies, if any
pub fn read_from_request(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Expire the session cookie (sign-out)
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE_NAME, "")).path("/"))
}

fn resolve(parts: &Parts, state: &AppState) -> Option<SessionData> {
    let credential = read_from_request(&parts.headers)?;
    state.session_codec.verify(&credential)
}

/// Caller with a valid session; rejects with 401 otherwise
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionData);

#[async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state)
            .map(CurrentSession)
            .ok_or(ApiError::Unauthorized)
    }
}

/// Caller session if there is a valid one. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalSession(pub Option<SessionData>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(resolve(parts, state)))
    }
}
