//! Shared helpers for the router-level tests
//!
//! The router runs for real; only the identity provider and game store are
//! replaced with in-memory doubles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use auth::{
    AppState,
    csrf::{CSRF_COOKIE_NAME, CSRF_HEADER_NAME, TokenGuard},
    game::GameStore,
    identity::{IdentityError, IdentityProvider},
    jwt::SessionCodec,
    models::{Credentials, Identity, NewAccount, ProfileUpdate, ScoreReceipt, ScoreSubmission},
    rate_limiter::RateLimiter,
    routes::create_router,
    session::SESSION_COOKIE_NAME,
    settings::SessionSecret,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Method, Request, Response,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Accounts keyed by email: (subject id, password)
#[derive(Default)]
pub struct InMemoryIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
    pub reset_requests: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_up(&self, account: &NewAccount) -> Result<Identity, IdentityError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&account.email) {
            return Err(IdentityError::AlreadyExists);
        }

        let subject_id = account
            .guest_subject_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        accounts.insert(
            account.email.clone(),
            (subject_id.clone(), account.password.clone()),
        );

        Ok(Identity {
            subject_id,
            email: Some(account.email.clone()),
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Option<Identity>, IdentityError> {
        let accounts = self.accounts.lock().await;
        Ok(accounts
            .get(&credentials.email)
            .filter(|(_, password)| *password == credentials.password)
            .map(|(subject_id, _)| Identity {
                subject_id: subject_id.clone(),
                email: Some(credentials.email.clone()),
            }))
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), IdentityError> {
        self.reset_requests.lock().await.push(email.to_string());
        Ok(())
    }

    async fn update_password(
        &self,
        subject_id: &str,
        new_password: &str,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.lock().await;
        let account = accounts
            .values_mut()
            .find(|(id, _)| id == subject_id)
            .ok_or(IdentityError::UnknownSubject)?;
        account.1 = new_password.to_string();
        Ok(())
    }
}

/// Scores and profiles keyed by subject id
#[derive(Default)]
pub struct InMemoryGameStore {
    pub scores: Mutex<Vec<(String, Uuid)>>,
    pub profiles: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn submit_score(&self, subject_id: &str, score: &ScoreSubmission) -> Result<ScoreReceipt> {
        self.scores
            .lock()
            .await
            .push((subject_id.to_string(), score.puzzle_id));

        Ok(ScoreReceipt {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
        })
    }

    async fn update_profile(&self, subject_id: &str, profile: &ProfileUpdate) -> Result<()> {
        self.profiles
            .lock()
            .await
            .insert(subject_id.to_string(), profile.display_name.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub identity: Arc<InMemoryIdentity>,
    pub game_store: Arc<InMemoryGameStore>,
    pub rate_limiter: RateLimiter,
}

/// Game store whose every write fails
pub struct FailingGameStore;

#[async_trait]
impl GameStore for FailingGameStore {
    async fn submit_score(&self, _subject_id: &str, _score: &ScoreSubmission) -> Result<ScoreReceipt> {
        anyhow::bail!("scores table unavailable")
    }

    async fn update_profile(&self, _subject_id: &str, _profile: &ProfileUpdate) -> Result<()> {
        anyhow::bail!("profiles table unavailable")
    }
}

impl TestApp {
    pub fn new() -> Self {
        let game_store = Arc::new(InMemoryGameStore::default());
        Self::build(game_store.clone(), game_store)
    }

    /// App whose router talks to `store` instead of the in-memory game store
    pub fn with_game_store(store: Arc<dyn GameStore>) -> Self {
        Self::build(store, Arc::new(InMemoryGameStore::default()))
    }

    fn build(routed_store: Arc<dyn GameStore>, game_store: Arc<InMemoryGameStore>) -> Self {
        let identity = Arc::new(InMemoryIdentity::default());
        let rate_limiter = RateLimiter::in_memory();

        let state = AppState {
            session_codec: SessionCodec::new(&SessionSecret::new(TEST_SECRET).unwrap()),
            token_guard: TokenGuard::new(false),
            rate_limiter: rate_limiter.clone(),
            identity: identity.clone(),
            game_store: routed_store,
            secure_cookies: false,
        };

        Self {
            router: create_router(state),
            identity,
            game_store,
            rate_limiter,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Fetch a CSRF token; returns the body token and the cookie value
    pub async fn csrf_token(&self) -> (String, String) {
        let response = self
            .send(
                Request::builder()
                    .uri("/api/csrf-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert!(response.status().is_success());

        let cookie = set_cookie(&response, CSRF_COOKIE_NAME).expect("csrf cookie is set");
        let body = body_json(response).await;
        let token = body["token"].as_str().expect("token in body").to_string();

        (token, cookie)
    }

    /// Bootstrap a guest and return the session cookie value
    pub async fn guest_session(&self) -> String {
        let (token, cookie) = self.csrf_token().await;
        let response = self
            .send(
                RequestSpec::post("/api/auth/guest")
                    .csrf(&cookie, &token)
                    .build(),
            )
            .await;
        assert_eq!(response.status(), 201);

        set_cookie(&response, SESSION_COOKIE_NAME).expect("session cookie is set")
    }
}

/// Small request builder for the tests
pub struct RequestSpec {
    method: Method,
    uri: String,
    cookies: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            cookies: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach the CSRF cookie and echo `header_token` in the header
    pub fn csrf(self, cookie_token: &str, header_token: &str) -> Self {
        self.cookie(CSRF_COOKIE_NAME, cookie_token)
            .header(CSRF_HEADER_NAME, header_token)
    }

    pub fn session(self, credential: &str) -> Self {
        self.cookie(SESSION_COOKIE_NAME, credential)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);

        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, cookie_header);
        }

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        match self.body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}

/// Value of a cookie set by the response, if any
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    set_cookie_header(response, name).and_then(|header| {
        header
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
    })
}

/// Full `Set-Cookie` header for a cookie, if any
pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&prefix))
        .map(str::to_string)
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body is readable");
    serde_json::from_slice(&bytes).expect("body is JSON")
}
