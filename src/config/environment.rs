// ABOUTME: Environment-based server configuration for ports, database, auth, and providers
// ABOUTME: Parses everything once at startup into an immutable ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Environment configuration
//!
//! All knobs are environment variables with sensible development defaults,
//! except `CLUBROOM_JWT_SECRET` which is required (a signing key must never
//! be defaulted).

use std::env;

use crate::constants::limits;
use crate::errors::{AppError, AppResult};

/// Top-level server configuration, loaded once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port (`CLUBROOM_HTTP_PORT`, default 8081)
    pub http_port: u16,
    /// Database URL (`DATABASE_URL`, default `sqlite:./data/clubroom.db`)
    pub database_url: String,
    /// Public base URL of this server (`BASE_URL`); used for OAuth redirect
    /// URIs and to infer the Secure cookie flag
    pub base_url: String,
    /// Token signing and issuance settings
    pub auth: AuthConfig,
    /// Front-end redirect targets
    pub frontend: FrontendConfig,
    /// Per-provider OAuth credentials
    pub oauth: OAuthProvidersConfig,
}

/// Token signing and role policy configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Base64-encoded HMAC secret (`CLUBROOM_JWT_SECRET`, required)
    pub jwt_secret_base64: String,
    /// Access-token lifetime in seconds (`CLUBROOM_TOKEN_LIFETIME_SECS`)
    pub token_lifetime_secs: i64,
    /// When true (default), first-time logins are created as USER; when
    /// false they start as GUEST and must complete onboarding
    /// (`CLUBROOM_SIGNUP_AUTO_PROMOTE`)
    pub signup_auto_promote: bool,
}

/// Allow-listed front-end origin and redirect paths
#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Exact front-end origin (`CLUBROOM_FRONTEND_ORIGIN`,
    /// default `http://localhost:3000`); login redirects must land here
    pub origin: String,
    /// Path on the front-end that receives `?token=` after login
    /// (`CLUBROOM_LOGIN_SUCCESS_PATH`, default `/oauth/redirect`)
    pub login_success_path: String,
    /// Path on the front-end that receives `?error=` after a failed login
    /// (`CLUBROOM_LOGIN_ERROR_PATH`, default `/oauth/error`)
    pub login_error_path: String,
}

/// OAuth client credentials for one provider
#[derive(Debug, Clone, Default)]
pub struct OAuthCredentials {
    /// OAuth client id
    pub client_id: Option<String>,
    /// OAuth client secret
    pub client_secret: Option<String>,
}

/// Credentials for every supported provider
#[derive(Debug, Clone, Default)]
pub struct OAuthProvidersConfig {
    /// Kakao credentials (`CLUBROOM_KAKAO_CLIENT_ID` / `_SECRET`)
    pub kakao: OAuthCredentials,
    /// Naver credentials (`CLUBROOM_NAVER_CLIENT_ID` / `_SECRET`)
    pub naver: OAuthCredentials,
    /// Google credentials (`CLUBROOM_GOOGLE_CLIENT_ID` / `_SECRET`)
    pub google: OAuthCredentials,
}

impl OAuthProvidersConfig {
    /// Credentials for a provider by name; `None` for unknown providers
    #[must_use]
    pub fn credentials(&self, provider: &str) -> Option<&OAuthCredentials> {
        match provider {
            "kakao" => Some(&self.kakao),
            "naver" => Some(&self.naver),
            "google" => Some(&self.google),
            _ => None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    ///
    /// # Errors
    /// Returns an error if `CLUBROOM_JWT_SECRET` is unset or a numeric
    /// variable fails to parse.
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env("CLUBROOM_HTTP_PORT", 8081_u16)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/clubroom.db".to_owned());

        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| format!("http://localhost:{http_port}"));

        let jwt_secret_base64 = env::var("CLUBROOM_JWT_SECRET").map_err(|_| {
            AppError::config("CLUBROOM_JWT_SECRET must be set (base64-encoded HMAC secret)")
        })?;

        let token_lifetime_secs = parse_env(
            "CLUBROOM_TOKEN_LIFETIME_SECS",
            limits::DEFAULT_TOKEN_LIFETIME_SECS,
        )?;

        let signup_auto_promote = parse_env("CLUBROOM_SIGNUP_AUTO_PROMOTE", true)?;

        Ok(Self {
            http_port,
            database_url,
            base_url,
            auth: AuthConfig {
                jwt_secret_base64,
                token_lifetime_secs,
                signup_auto_promote,
            },
            frontend: FrontendConfig {
                origin: env::var("CLUBROOM_FRONTEND_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:3000".to_owned()),
                login_success_path: env::var("CLUBROOM_LOGIN_SUCCESS_PATH")
                    .unwrap_or_else(|_| "/oauth/redirect".to_owned()),
                login_error_path: env::var("CLUBROOM_LOGIN_ERROR_PATH")
                    .unwrap_or_else(|_| "/oauth/error".to_owned()),
            },
            oauth: OAuthProvidersConfig {
                kakao: provider_credentials("KAKAO"),
                naver: provider_credentials("NAVER"),
                google: provider_credentials("GOOGLE"),
            },
        })
    }

    /// Redirect URI registered with a provider for its callback
    #[must_use]
    pub fn callback_url(&self, provider: &str) -> String {
        format!("{}/login/oauth2/code/{provider}", self.base_url)
    }

    /// Whether cookies should carry the Secure flag
    ///
    /// Derived from the public base URL; unknown schemes fail secure.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        !self.base_url.starts_with("http://")
    }
}

fn provider_credentials(prefix: &str) -> OAuthCredentials {
    OAuthCredentials {
        client_id: env::var(format!("CLUBROOM_{prefix}_CLIENT_ID")).ok(),
        client_secret: env::var(format!("CLUBROOM_{prefix}_CLIENT_SECRET")).ok(),
    }
}

fn parse_env<T>(name: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
