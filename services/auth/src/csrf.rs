//! Double-submit CSRF protection
//!
//! A random token is written to an HttpOnly cookie and handed to the page in the
//! body of `GET /api/csrf-token`. Every mutating request must echo the same
//! value in the `x-csrf-token` header. A cross-origin form can make the browser
//! attach the cookie but has no way to read it, so it cannot produce the header.
//! Nothing is stored server-side.

use axum::{
    Json,
    http::{Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{RngCore, rngs::OsRng};
use serde_json::json;
use time::Duration;
use tracing::warn;

/// Cookie carrying the server copy of the token
pub const CSRF_COOKIE_NAME: &str = "csrf_token";

/// Header the client echoes the token in
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Machine-checkable error code returned on rejection
pub const CSRF_ERROR_CODE: &str = "CSRF_TOKEN_INVALID";

const TOKEN_BYTES: usize = 32;
const TOKEN_TTL_HOURS: i64 = 24;

/// Generate a fresh token: 256 bits from the OS RNG, base64url without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Check a cookie/header pair.
///
/// Both values must be present, non-empty and byte-for-byte identical. No
/// trimming or case folding is applied.
pub fn validate(cookie_value: Option<&str>, header_value: Option<&str>) -> bool {
    match (cookie_value, header_value) {
        (Some(cookie), Some(header)) if !cookie.is_empty() && !header.is_empty() => {
            constant_time_eq(cookie.as_bytes(), header.as_bytes())
        }
        _ => false,
    }
}

/// Length is compared up front; the content comparison touches every byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }

    diff == 0
}

/// Methods that change state and therefore need a token
pub fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

/// Check a request against the double-submit rule.
///
/// Returns `None` when the request may proceed: either the method is not
/// mutating, or cookie and header match. Otherwise returns the rejection to
/// send back.
pub fn guard<B>(request: &Request<B>) -> Option<CsrfRejection> {
    if !is_mutating(request.method()) {
        return None;
    }

    let jar = CookieJar::from_headers(request.headers());
    let cookie_value = jar.get(CSRF_COOKIE_NAME).map(|cookie| cookie.value());
    let header_value = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|value| value.to_str().ok());

    if validate(cookie_value, header_value) {
        return None;
    }

    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        cookie_present = cookie_value.is_some(),
        header_present = header_value.is_some(),
        "Rejected request with missing or mismatched CSRF token"
    );

    Some(CsrfRejection)
}

/// 403 response for a failed CSRF check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrfRejection;

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": CSRF_ERROR_CODE,
            "message": "Invalid or missing CSRF token. Please refresh the page and try again.",
        }));

        (StatusCode::FORBIDDEN, body).into_response()
    }
}

/// Issues, rotates and clears the CSRF cookie
#[derive(Debug, Clone, Copy)]
pub struct TokenGuard {
    secure: bool,
}

impl TokenGuard {
    /// `secure` sets the `Secure` attribute, which production must use
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Generate a token and the cookie that carries it
    pub fn issue_token(&self) -> (String, Cookie<'static>) {
        let token = generate_token();
        let cookie = Cookie::build((CSRF_COOKIE_NAME, token.clone()))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(Duration::hours(TOKEN_TTL_HOURS))
            .build();

        (token, cookie)
    }

    /// Replace whatever token the jar holds with a new one.
    ///
    /// Called on the token endpoint and after every sign-in or sign-up so a
    /// token observed before authentication stops working.
    pub fn rotate(&self, jar: CookieJar) -> (String, CookieJar) {
        let (token, cookie) = self.issue_token();
        (token, jar.add(cookie))
    }

    /// Expire the CSRF cookie
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((CSRF_COOKIE_NAME, "")).path("/"))
    }
}
