//! Double-submit CSRF checks through the full router

mod common;

use auth::csrf::{CSRF_COOKIE_NAME, CSRF_ERROR_CODE};
use axum::http::{Method, StatusCode};
use common::{RequestSpec, TestApp, body_json, set_cookie, set_cookie_header};

#[tokio::test]
async fn test_token_endpoint_sets_matching_cookie() {
    let app = TestApp::new();
    let (token, cookie) = app.csrf_token().await;

    assert_eq!(token, cookie);
    assert!(token.len() >= 40);

    let (second, _) = app.csrf_token().await;
    assert_ne!(token, second);
}

#[tokio::test]
async fn test_token_cookie_attributes() {
    let app = TestApp::new();
    let response = app
        .send(RequestSpec::get("/api/csrf-token").build())
        .await;

    let header = set_cookie_header(&response, CSRF_COOKIE_NAME).unwrap();
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("SameSite=Strict"));
    assert!(header.contains("Path=/"));
    assert!(header.contains("Max-Age=86400"));
}

#[tokio::test]
async fn test_matching_header_passes() {
    let app = TestApp::new();
    let (token, cookie) = app.csrf_token().await;

    let response = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .csrf(&cookie, &token)
                .build(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_trailing_space_in_header_is_rejected() {
    let app = TestApp::new();
    let (token, cookie) = app.csrf_token().await;

    let response = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .csrf(&cookie, &format!("{} ", token))
                .build(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], CSRF_ERROR_CODE);
}

#[tokio::test]
async fn test_missing_cookie_or_header_is_rejected() {
    let app = TestApp::new();
    let (token, _) = app.csrf_token().await;

    let header_only = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .header("x-csrf-token", &token)
                .build(),
        )
        .await;
    assert_eq!(header_only.status(), StatusCode::FORBIDDEN);

    let cookie_only = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .cookie(CSRF_COOKIE_NAME, &token)
                .build(),
        )
        .await;
    assert_eq!(cookie_only.status(), StatusCode::FORBIDDEN);

    let neither = app
        .send(RequestSpec::post("/api/auth/guest").build())
        .await;
    assert_eq!(neither.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_from_another_cookie_is_rejected() {
    let app = TestApp::new();
    let (_, cookie) = app.csrf_token().await;
    let (other_token, _) = app.csrf_token().await;

    let response = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .csrf(&cookie, &other_token)
                .build(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_safe_methods_skip_the_check() {
    let app = TestApp::new();

    let response = app
        .send(RequestSpec::get("/api/auth/session").build())
        .await;

    // No session, but the CSRF guard did not answer.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_patch_is_guarded() {
    let app = TestApp::new();
    let credential = app.guest_session().await;

    let response = app
        .send(
            RequestSpec::new(Method::PATCH, "/api/profile")
                .session(&credential)
                .json(serde_json::json!({ "displayName": "Wordsmith" }))
                .build(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_session_start_rotates_token() {
    let app = TestApp::new();
    let (token, cookie) = app.csrf_token().await;

    let response = app
        .send(
            RequestSpec::post("/api/auth/guest")
                .csrf(&cookie, &token)
                .build(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let rotated = set_cookie(&response, CSRF_COOKIE_NAME).expect("csrf cookie rotated");
    assert_ne!(rotated, token);

    let body = body_json(response).await;
    assert_eq!(body["csrfToken"], rotated.as_str());
}
