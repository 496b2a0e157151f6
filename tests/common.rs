// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides common database, auth, and identity creation helpers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(dead_code, clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! Shared test utilities for `clubroom`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use std::sync::Once;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use clubroom::auth::AuthManager;
use clubroom::config::environment::{
    AuthConfig, FrontendConfig, OAuthCredentials, OAuthProvidersConfig, ServerConfig,
};
use clubroom::database::Database;
use clubroom::models::{CanonicalIdentity, User, UserRole};
use clubroom::state::ServerState;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

/// Fixed base64 signing secret shared by test managers
pub fn test_secret() -> String {
    STANDARD.encode([11_u8; 64])
}

/// Auth manager signing with the shared test secret
pub fn test_auth_manager(token_lifetime_secs: i64) -> AuthManager {
    AuthManager::new(&test_secret(), token_lifetime_secs).unwrap()
}

/// Fresh in-memory database with the schema prepared
pub async fn test_database() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

/// Server configuration for router-level tests (no network)
pub fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_owned(),
        base_url: "http://localhost:8081".to_owned(),
        auth: AuthConfig {
            jwt_secret_base64: test_secret(),
            token_lifetime_secs: 3600,
            signup_auto_promote: true,
        },
        frontend: FrontendConfig {
            origin: "http://localhost:3000".to_owned(),
            login_success_path: "/oauth/redirect".to_owned(),
            login_error_path: "/oauth/error".to_owned(),
        },
        oauth: OAuthProvidersConfig {
            kakao: test_credentials("kakao"),
            naver: test_credentials("naver"),
            google: test_credentials("google"),
        },
    }
}

fn test_credentials(provider: &str) -> OAuthCredentials {
    OAuthCredentials {
        client_id: Some(format!("test_{provider}_client_id")),
        client_secret: Some(format!("test_{provider}_client_secret")),
    }
}

/// Full server state over a fresh in-memory database
pub async fn test_state() -> ServerState {
    ServerState::new(test_config(), test_database().await).unwrap()
}

/// Canonical identity builder for resolver tests
pub fn identity(
    provider: &str,
    subject: &str,
    email: Option<&str>,
    display_name: Option<&str>,
) -> CanonicalIdentity {
    CanonicalIdentity {
        provider: provider.to_owned(),
        provider_subject_id: subject.to_owned(),
        email: email.map(str::to_owned),
        display_name: display_name.map(str::to_owned),
        avatar_url: None,
    }
}

/// Create a user through the resolver at the given role
pub async fn login_user(database: &Database, subject: &str, role: UserRole) -> User {
    database
        .find_or_create_user(
            &identity(
                "kakao",
                subject,
                Some(&format!("{subject}@example.com")),
                Some("Tester"),
            ),
            role,
        )
        .await
        .unwrap()
}
