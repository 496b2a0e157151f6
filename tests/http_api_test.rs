// ABOUTME: Router-level tests for the authentication filter and role gating
// ABOUTME: Exercises the structured 401/403 responder and identity pass-through
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use clubroom::models::UserRole;
use clubroom::routes;
use serde_json::Value;
use tower::ServiceExt;

use common::{init_test_logging, login_user, test_state};

async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn protected_route_without_a_token_gets_the_structured_401() {
    init_test_logging();
    let state = test_state().await;
    let app = routes::router(state);

    let response = app.oneshot(get("/api/users/me", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["path"], "/api/users/me");
    assert!(body["message"].as_str().is_some());
}

#[tokio::test]
async fn a_garbage_token_leaves_the_request_unauthenticated() {
    init_test_logging();
    let state = test_state().await;
    let app = routes::router(state);

    // The filter does not reject; the route's extractor does
    let response = app
        .oneshot(get("/api/users/me", Some("not-a-real-token")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn a_valid_token_reaches_the_me_route() {
    init_test_logging();
    let state = test_state().await;
    let user = login_user(&state.database, "api-1", UserRole::User).await;
    let token = state
        .auth
        .issue(&user, &[user.role.as_str().to_owned()])
        .unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(get("/api/users/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["user_id"], user.id.to_string());
    assert_eq!(body["display_name"], "Tester");
    assert_eq!(body["role"], "USER");
}

#[tokio::test]
async fn admin_routes_reject_lesser_roles_with_the_structured_403() {
    init_test_logging();
    let state = test_state().await;
    let user = login_user(&state.database, "api-2", UserRole::User).await;
    let token = state
        .auth
        .issue(&user, &[user.role.as_str().to_owned()])
        .unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(get("/api/membership/applications", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = body_json(response).await;
    assert_eq!(body["status"], 403);
    assert_eq!(body["error"], "Forbidden");
    assert_eq!(body["path"], "/api/membership/applications");
}

#[tokio::test]
async fn admin_routes_accept_admin_tokens() {
    init_test_logging();
    let state = test_state().await;
    let admin = login_user(&state.database, "api-3", UserRole::Admin).await;
    let token = state
        .auth
        .issue(&admin, &[admin.role.as_str().to_owned()])
        .unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(get("/api/membership/applications", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn an_expired_token_is_rejected_at_the_route() {
    init_test_logging();
    let state = test_state().await;
    let user = login_user(&state.database, "api-4", UserRole::User).await;

    // A second manager over the same secret with a negative lifetime
    let expired_issuer = common::test_auth_manager(-10);
    let token = expired_issuer
        .issue(&user, &[user.role.as_str().to_owned()])
        .unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(get("/api/users/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn member_profile_is_gated_on_the_member_tier() {
    init_test_logging();
    let state = test_state().await;
    let user = login_user(&state.database, "api-6", UserRole::User).await;
    let admin = login_user(&state.database, "api-7", UserRole::Admin).await;
    let user_token = state
        .auth
        .issue(&user, &["USER".to_owned()])
        .unwrap();
    let app = routes::router(state.clone());

    // A plain USER is refused
    let response = app
        .clone()
        .oneshot(get("/api/membership/profile", Some(&user_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Approve the user's application, then retry with a MEMBER token
    let service = clubroom::membership::MembershipService::new(state.database.clone());
    let application = service
        .submit_application(user.id, "router-level test")
        .await
        .unwrap();
    service.approve(application.id, admin.id).await.unwrap();

    let member_token = state
        .auth
        .issue(&user, &["MEMBER".to_owned()])
        .unwrap();
    let response = app
        .oneshot(get("/api/membership/profile", Some(&member_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["introduction"], "router-level test");
}

#[tokio::test]
async fn health_is_public() {
    init_test_logging();
    let state = test_state().await;
    let app = routes::router(state);

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn withdrawal_soft_deletes_the_account() {
    init_test_logging();
    let state = test_state().await;
    let user = login_user(&state.database, "api-5", UserRole::User).await;
    let token = state
        .auth
        .issue(&user, &[user.role.as_str().to_owned()])
        .unwrap();
    let database = state.database.clone();
    let app = routes::router(state);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/users/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let stored = database.get_user(user.id).await.unwrap().unwrap();
    assert!(stored.is_withdrawn());
}
