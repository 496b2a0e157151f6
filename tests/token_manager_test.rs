// ABOUTME: Token issuer/validator tests: round trips, tampering, expiry, algorithm confinement
// ABOUTME: Validation must be a uniform boolean regardless of the failure category
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::Utc;
use clubroom::models::UserRole;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use common::{init_test_logging, login_user, test_auth_manager, test_database, test_secret};

#[tokio::test]
async fn issued_token_validates_and_parses_back() {
    init_test_logging();
    let database = test_database().await;
    let manager = test_auth_manager(3600);
    let user = login_user(&database, "42", UserRole::Member).await;

    let token = manager.issue(&user, &["MEMBER".to_owned()]).unwrap();

    // Freshly issued tokens validate immediately
    assert!(manager.validate(&token));

    let (user_id, roles) = manager.parse(&token).unwrap();
    assert_eq!(user_id, user.id);
    assert_eq!(roles, vec!["MEMBER".to_owned()]);
}

#[tokio::test]
async fn multiple_roles_round_trip_through_the_claim() {
    init_test_logging();
    let database = test_database().await;
    let manager = test_auth_manager(3600);
    let user = login_user(&database, "43", UserRole::Admin).await;

    let roles = vec!["MEMBER".to_owned(), "ADMIN".to_owned()];
    let token = manager.issue(&user, &roles).unwrap();

    let (_, parsed) = manager.parse(&token).unwrap();
    assert_eq!(parsed, roles);
}

#[tokio::test]
async fn tampered_signature_fails_validation() {
    init_test_logging();
    let database = test_database().await;
    let manager = test_auth_manager(3600);
    let user = login_user(&database, "44", UserRole::User).await;

    let token = manager.issue(&user, &["USER".to_owned()]).unwrap();

    // Flip the last signature character to a guaranteed-different one
    let mut chars: Vec<char> = token.chars().collect();
    let last = *chars.last().unwrap();
    *chars.last_mut().unwrap() = if last == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();

    assert_ne!(token, tampered);
    assert!(!manager.validate(&tampered));
}

#[tokio::test]
async fn expired_token_fails_validation() {
    init_test_logging();
    let database = test_database().await;
    // Negative lifetime: the token is already past its expiry when issued
    let manager = test_auth_manager(-10);
    let user = login_user(&database, "45", UserRole::User).await;

    let token = manager.issue(&user, &["USER".to_owned()]).unwrap();
    assert!(!manager.validate(&token));
}

#[tokio::test]
async fn token_from_a_different_key_fails_validation() {
    init_test_logging();
    let database = test_database().await;
    let manager = test_auth_manager(3600);
    let user = login_user(&database, "46", UserRole::User).await;
    let token = manager.issue(&user, &["USER".to_owned()]).unwrap();

    let other = clubroom::auth::AuthManager::new(
        &base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [99_u8; 64]),
        3600,
    )
    .unwrap();
    assert!(!other.validate(&token));
}

#[tokio::test]
async fn token_signed_with_wrong_algorithm_fails_validation() {
    init_test_logging();
    let manager = test_auth_manager(3600);

    // Same key, but HS256 instead of HS512
    let now = Utc::now().timestamp();
    let claims = serde_json::json!({
        "sub": "b2f8fd6e-0000-4000-8000-000000000000",
        "email": "a@x.com",
        "roles": "USER",
        "iat": now,
        "exp": now + 600,
    });
    let foreign = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_base64_secret(&test_secret()).unwrap(),
    )
    .unwrap();

    assert!(!manager.validate(&foreign));
}

#[tokio::test]
async fn structurally_invalid_tokens_fail_validation() {
    init_test_logging();
    let manager = test_auth_manager(3600);

    assert!(!manager.validate(""));
    assert!(!manager.validate("not-a-token"));
    assert!(!manager.validate("a.b.c"));
}

#[tokio::test]
async fn role_names_may_not_contain_the_separator() {
    init_test_logging();
    let database = test_database().await;
    let manager = test_auth_manager(3600);
    let user = login_user(&database, "47", UserRole::User).await;

    let result = manager.issue(&user, &["USER,ADMIN".to_owned()]);
    assert!(result.is_err());
}
