//! HTTP routes and handlers
//!
//! Route groups share a rate-limit preset. Every group also carries the CSRF
//! guard, which lets safe methods through untouched. Handlers that need a
//! caller take [`CurrentSession`].

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    identity::IdentityError,
    middleware::{csrf_middleware, rate_limit_middleware},
    models::{Credentials, Identity, NewAccount, ProfileUpdate, ScoreSubmission, SessionData},
    rate_limiter::{RateLimitConfig, RateLimiter},
    session::{self, CurrentSession, OptionalSession},
    state::AppState,
    validation,
};

/// Body of `GET /api/csrf-token`
#[derive(Serialize)]
pub struct CsrfTokenResponse {
    pub token: String,
    pub message: String,
}

/// Body returned whenever a session is issued
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub subject_id: String,
    pub is_ephemeral: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Fresh CSRF token after an authentication change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
    pub new_password: String,
}

fn with_rate_limit(
    router: Router<AppState>,
    limiter: &RateLimiter,
    config: RateLimitConfig,
) -> Router<AppState> {
    router
        .route_layer(middleware::from_fn(csrf_middleware))
        .route_layer(middleware::from_fn_with_state(
            (limiter.clone(), config),
            rate_limit_middleware,
        ))
}

/// Create the router for the service
pub fn create_router(state: AppState) -> Router {
    let limiter = state.rate_limiter.clone();

    let general = Router::new()
        .route("/api/csrf-token", get(csrf_token))
        .route("/api/auth/session", get(current_session))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/profile", patch(update_profile));

    let auth = Router::new()
        .route("/api/auth/guest", post(guest))
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/password", post(update_password));

    let password_reset =
        Router::new().route("/api/auth/password-reset", post(request_password_reset));

    let scores = Router::new().route("/api/scores", post(submit_score));

    Router::new()
        .route("/health", get(health_check))
        .merge(with_rate_limit(general, &limiter, RateLimitConfig::GENERAL))
        .merge(with_rate_limit(auth, &limiter, RateLimitConfig::AUTH))
        .merge(with_rate_limit(
            password_reset,
            &limiter,
            RateLimitConfig::PASSWORD_RESET,
        ))
        .merge(with_rate_limit(
            scores,
            &limiter,
            RateLimitConfig::SCORE_SUBMISSION,
        ))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

/// Issue a CSRF token. Callable before any session exists.
pub async fn csrf_token(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let (token, jar) = state.token_guard.rotate(jar);

    (
        jar,
        Json(CsrfTokenResponse {
            token,
            message: "CSRF token generated".to_string(),
        }),
    )
}

/// Start a session for `identity` and rotate the CSRF token
fn start_session(
    state: &AppState,
    jar: CookieJar,
    identity: &Identity,
    is_ephemeral: bool,
) -> ApiResult<(CookieJar, SessionResponse)> {
    let credential = state
        .session_codec
        .issue(&identity.subject_id, is_ephemeral, identity.email.as_deref())
        .map_err(|e| {
            error!("Failed to sign session credential: {}", e);
            ApiError::InternalServerError
        })?;

    let jar = session::attach_to_response(jar, credential, state.secure_cookies);
    let (csrf_token, jar) = state.token_guard.rotate(jar);

    Ok((
        jar,
        SessionResponse {
            subject_id: identity.subject_id.clone(),
            is_ephemeral,
            email: identity.email.clone(),
            csrf_token: Some(csrf_token),
        },
    ))
}

/// Bootstrap a guest identity. A caller that already has a session keeps it.
pub async fn guest(
    State(state): State<AppState>,
    OptionalSession(existing): OptionalSession,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if let Some(existing) = existing {
        return Ok((
            StatusCode::OK,
            jar,
            Json(SessionResponse {
                subject_id: existing.subject_id,
                is_ephemeral: existing.is_ephemeral,
                email: existing.email,
                csrf_token: None,
            }),
        ));
    }

    let identity = Identity {
        subject_id: Uuid::new_v4().to_string(),
        email: None,
    };
    info!("Bootstrapping guest {}", identity.subject_id);

    let (jar, body) = start_session(&state, jar, &identity, true)?;
    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// Create a durable account, upgrading the caller's guest identity if present
pub async fn sign_up(
    State(state): State<AppState>,
    OptionalSession(existing): OptionalSession,
    jar: CookieJar,
    Json(mut payload): Json<NewAccount>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_email(&payload.email).map_err(ApiError::BadRequest)?;
    validation::validate_password(&payload.password).map_err(ApiError::BadRequest)?;
    validation::validate_display_name(&payload.display_name).map_err(ApiError::BadRequest)?;

    payload.guest_subject_id = existing
        .filter(|session| session.is_ephemeral)
        .map(|session| session.subject_id);

    let identity = state
        .identity
        .sign_up(&payload)
        .await
        .map_err(|e| match e {
            IdentityError::AlreadyExists => {
                ApiError::Conflict("An account with this email already exists".to_string())
            }
            e => {
                error!("Failed to create account: {}", e);
                ApiError::InternalServerError
            }
        })?;

    let profile = ProfileUpdate {
        display_name: payload.display_name.clone(),
    };
    state
        .game_store
        .update_profile(&identity.subject_id, &profile)
        .await
        .map_err(|e| {
            error!("Failed to store profile for new account: {}", e);
            ApiError::InternalServerError
        })?;

    info!("Signed up {}", identity.subject_id);
    let (jar, body) = start_session(&state, jar, &identity, false)?;
    Ok((StatusCode::CREATED, jar, Json(body)))
}

/// Sign in with email and password
pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<Credentials>,
) -> ApiResult<impl IntoResponse> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let identity = state
        .identity
        .sign_in(&payload)
        .await
        .map_err(|e| {
            error!("Sign-in failed: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or(ApiError::InvalidCredentials)?;

    info!("Signed in {}", identity.subject_id);
    let (jar, body) = start_session(&state, jar, &identity, false)?;
    Ok((jar, Json(body)))
}

/// Drop the session and CSRF cookies
pub async fn sign_out(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let jar = session::clear(jar);
    let jar = state.token_guard.clear(jar);

    (jar, Json(json!({ "message": "Signed out successfully" })))
}

/// Ask for a password-reset email. The answer never reveals whether the
/// address has an account.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_email(&payload.email).map_err(ApiError::BadRequest)?;

    if let Err(e) = state.identity.request_password_reset(&payload.email).await {
        error!("Failed to request password reset: {}", e);
    }

    Ok(Json(json!({
        "message": "If an account exists for this email, a reset link is on its way"
    })))
}

/// Change the password of a signed-in, durable account
pub async fn update_password(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    jar: CookieJar,
    Json(payload): Json<PasswordUpdateRequest>,
) -> ApiResult<impl IntoResponse> {
    if current.is_ephemeral {
        return Err(ApiError::Unauthorized);
    }

    validation::validate_password(&payload.new_password).map_err(ApiError::BadRequest)?;

    state
        .identity
        .update_password(&current.subject_id, &payload.new_password)
        .await
        .map_err(|e| match e {
            IdentityError::UnknownSubject => ApiError::Unauthorized,
            e => {
                error!("Failed to update password: {}", e);
                ApiError::InternalServerError
            }
        })?;

    let (csrf_token, jar) = state.token_guard.rotate(jar);
    Ok((
        jar,
        Json(json!({
            "message": "Password updated",
            "csrfToken": csrf_token,
        })),
    ))
}

/// Who is calling
pub async fn current_session(CurrentSession(current): CurrentSession) -> Json<SessionData> {
    Json(current)
}

/// Record a finished puzzle
pub async fn submit_score(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    Json(payload): Json<ScoreSubmission>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_score(&payload).map_err(ApiError::BadRequest)?;

    let receipt = state
        .game_store
        .submit_score(&current.subject_id, &payload)
        .await
        .map_err(|e| {
            error!("Failed to store score: {}", e);
            ApiError::InternalServerError
        })?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Change profile details
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentSession(current): CurrentSession,
    Json(payload): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    validation::validate_display_name(&payload.display_name).map_err(ApiError::BadRequest)?;

    state
        .game_store
        .update_profile(&current.subject_id, &payload)
        .await
        .map_err(|e| {
            error!("Failed to update profile: {}", e);
            ApiError::InternalServerError
        })?;

    Ok(Json(json!({ "message": "Profile updated" })))
}
