//! End-to-end authentication flow tests
//!
//! Drives the full router: path policy, token verification against the
//! mock JWKS, provider profile fetch with claims fallback, identity
//! reconciliation, and the attached request context.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_json, json_body, TestApp};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn missing_authorization_header_is_rejected_before_any_handler() {
    let app = TestApp::new().await;

    let response = app.get("/api/v1/user/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Nothing was created or updated
    assert_eq!(app.users.active_count(), 0);
}

#[tokio::test]
async fn malformed_authorization_scheme_is_rejected() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/user/me")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_token_for_new_subject_creates_local_user() {
    let app = TestApp::new().await;
    let token = app.token("user_new", "new@x.com", "Ada", "Lovelace");

    let response = app.get("/api/v1/user/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Middleware adds correlation and timing headers on protected routes
    assert!(response.headers().contains_key("x-request-id"));
    assert!(response.headers().contains_key("x-auth-time"));
    assert!(response.headers().contains_key("x-process-time"));

    let body = json_body(response).await;
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(body["email"], "new@x.com");
    assert_eq!(body["external_id"], "user_new");
    assert_eq!(body["first_name"], "Ada");

    assert_eq!(app.users.active_count(), 1);
}

#[tokio::test]
async fn second_request_updates_profile_but_keeps_internal_id() {
    let app = TestApp::new().await;

    let token = app.token("user_abc", "ada@example.com", "Ada", "Lovelace");
    let body = expect_json(
        app.get("/api/v1/user/me", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    let first_id = body["id"].as_str().unwrap().to_string();

    // Same subject comes back with a changed name claim
    let token = app.token("user_abc", "ada@example.com", "Ada", "King");
    let body = expect_json(
        app.get("/api/v1/user/me", Some(&token)).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["id"], first_id.as_str());
    assert_eq!(body["last_name"], "King");
    assert_eq!(app.users.active_count(), 1);
}

#[tokio::test]
async fn unreachable_jwks_fails_closed_with_503() {
    let app = TestApp::with_unreachable_jwks().await;
    let token = app.token("user_new", "new@x.com", "Ada", "Lovelace");

    let response = app.get("/api/v1/user/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // No local user was created or updated
    assert_eq!(app.users.active_count(), 0);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let app = TestApp::new().await;
    let token = app.expired_token("user_abc");

    let response = app.get("/api/v1/user/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_with_unknown_key_id_is_unauthorized() {
    let app = TestApp::new().await;
    let token = app.foreign_kid_token("user_abc");

    let response = app.get("/api/v1/user/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn excluded_path_bypasses_authentication() {
    let app = TestApp::new().await;

    // Seed a user and look it up by internal id with no token at all
    let seeded = atrium_api::domain::User {
        email: "seeded@example.com".to_string(),
        ..Default::default()
    };
    let id = seeded.id;
    app.users.insert(seeded);

    let body = expect_json(
        app.get(&format!("/api/v1/user/{}", id), None).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["email"], "seeded@example.com");
}

#[tokio::test]
async fn options_requests_bypass_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::OPTIONS, "/api/v1/user/me", None, None)
        .await;
    // CORS preflight is never answered with 401; the router's method
    // handling takes over instead
    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_profile_is_preferred_over_token_claims() {
    let app = TestApp::new().await;

    // The user API reports a different (richer) name than the token
    app.mount_profile(
        "user_api",
        serde_json::json!({
            "id": "user_api",
            "first_name": "Augusta",
            "last_name": "King",
            "profile_image_url": "https://img.example.com/aal.png",
            "email_addresses": [
                {"email_address": "countess@example.com", "primary": true}
            ]
        }),
    )
    .await;

    let token = app.token("user_api", "token@example.com", "Ada", "Lovelace");
    let body = expect_json(
        app.get("/api/v1/user/me", Some(&token)).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["first_name"], "Augusta");
    assert_eq!(body["email"], "countess@example.com");
    assert_eq!(body["avatar_url"], "https://img.example.com/aal.png");
}

#[tokio::test]
async fn email_fallback_links_pre_federation_account() {
    let app = TestApp::new().await;

    // Account provisioned before provider federation existed: matching
    // email, no external id
    let legacy = atrium_api::domain::User {
        email: "legacy@example.com".to_string(),
        first_name: "Legacy".to_string(),
        ..Default::default()
    };
    let legacy_id = legacy.id;
    app.users.insert(legacy);

    let token = app.token("user_legacy", "legacy@example.com", "Ada", "Lovelace");
    let body = expect_json(
        app.get("/api/v1/user/me", Some(&token)).await,
        StatusCode::OK,
    )
    .await;

    // Linked, not duplicated
    assert_eq!(body["id"], legacy_id.to_string().as_str());
    assert_eq!(body["external_id"], "user_legacy");
    assert_eq!(app.users.active_count(), 1);
}

#[tokio::test]
async fn duplicate_email_across_subjects_is_a_conflict() {
    let app = TestApp::new().await;

    // An active user already owns this email under another subject
    let owner = atrium_api::domain::User {
        external_id: Some("user_owner".to_string()),
        email: "taken@x.com".to_string(),
        ..Default::default()
    };
    app.users.insert(owner);

    // A different subject claims the same email. The middleware degrades
    // its reconcile failure to unlinked, so drive the reconciler directly
    // through the sync endpoint, which propagates the error.
    let token = app.token("user_thief", "taken@x.com", "Eve", "Intruder");
    let response = app
        .request(Method::POST, "/api/v1/user/me", Some(&token), None)
        .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.users.active_count(), 1);
}

#[tokio::test]
async fn reconcile_failure_leaves_request_authenticated_but_unlinked() {
    let app = TestApp::with_failing_user_store().await;
    let token = app.token("user_abc", "ada@example.com", "Ada", "Lovelace");

    // The request proceeds: identity-only endpoints still answer
    let body = expect_json(
        app.get("/api/v1/auth/session", Some(&token)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(body["user_id"], "user_abc");

    // Handlers that need the local record reject
    let response = app.get("/api/v1/user/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_endpoint_reflects_token_claims() {
    let app = TestApp::new().await;
    let token = app.token("user_abc", "ada@example.com", "Ada", "Lovelace");

    let body = expect_json(
        app.get("/api/v1/auth/session", Some(&token)).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["user_id"], "user_abc");
    assert_eq!(body["issuer"], app.issuer.as_str());
    assert!(body["expires_at"].as_i64().unwrap() > body["issued_at"].as_i64().unwrap());
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = TestApp::new().await;
    let body = expect_json(app.get("/health", None).await, StatusCode::OK).await;
    assert_eq!(body["status"], "ok");
}
