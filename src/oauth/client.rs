// ABOUTME: OAuth2 authorization-code client and static provider descriptors
// ABOUTME: Builds authorize URLs, exchanges codes for tokens, fetches user-info payloads
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! OAuth2 client
//!
//! Provider endpoints and payload-shape facts live in a static descriptor
//! table; the client itself only knows the authorization-code grant. Token
//! responses are used once (to fetch the user-info payload) and discarded;
//! Clubroom never stores provider tokens.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::error;
use urlencoding::encode;

use crate::config::environment::OAuthCredentials;
use crate::errors::{AppError, AppResult};

/// Endpoint and payload-shape facts for one provider
pub struct ProviderDescriptor {
    /// Provider name as used in URLs and stored on users
    pub name: &'static str,
    /// Authorization endpoint
    pub auth_url: &'static str,
    /// Token endpoint
    pub token_url: &'static str,
    /// User-info endpoint
    pub user_info_url: &'static str,
    /// Key carrying the subject id in the user-info payload (for Naver, the
    /// nesting key)
    pub subject_id_key: &'static str,
    /// Scopes requested at authorization time
    pub scopes: &'static [&'static str],
    /// Separator the provider expects between scopes
    pub scope_separator: &'static str,
}

static PROVIDERS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        name: "kakao",
        auth_url: "https://kauth.kakao.com/oauth/authorize",
        token_url: "https://kauth.kakao.com/oauth/token",
        user_info_url: "https://kapi.kakao.com/v2/user/me",
        subject_id_key: "id",
        scopes: &["profile_nickname", "profile_image", "account_email"],
        scope_separator: ",",
    },
    ProviderDescriptor {
        name: "naver",
        auth_url: "https://nid.naver.com/oauth2.0/authorize",
        token_url: "https://nid.naver.com/oauth2.0/token",
        user_info_url: "https://openapi.naver.com/v1/nid/me",
        subject_id_key: "response",
        // Naver scopes are configured in the developer console, not requested
        scopes: &[],
        scope_separator: ",",
    },
    ProviderDescriptor {
        name: "google",
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        user_info_url: "https://openidconnect.googleapis.com/v1/userinfo",
        subject_id_key: "sub",
        scopes: &["openid", "email", "profile"],
        scope_separator: " ",
    },
];

/// Descriptor for a provider by name
#[must_use]
pub fn descriptor(provider: &str) -> Option<&'static ProviderDescriptor> {
    PROVIDERS.iter().find(|d| d.name == provider)
}

/// Whether a provider is supported
#[must_use]
pub fn is_supported(provider: &str) -> bool {
    descriptor(provider).is_some()
}

/// Token endpoint response; only the access token is consumed
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Authorization-code grant client shared across requests
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    /// Client with a bounded request timeout
    #[must_use]
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build the provider authorization URL the user is redirected to
    #[must_use]
    pub fn authorization_url(
        descriptor: &ProviderDescriptor,
        client_id: &str,
        redirect_uri: &str,
        state: &str,
    ) -> String {
        let mut url = format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&state={}",
            descriptor.auth_url,
            encode(client_id),
            encode(redirect_uri),
            encode(state)
        );

        if !descriptor.scopes.is_empty() {
            let scope = descriptor.scopes.join(descriptor.scope_separator);
            // Writing to String cannot fail
            let _ = write!(url, "&scope={}", encode(&scope));
        }

        url
    }

    /// Exchange an authorization code for an access token
    ///
    /// # Errors
    /// Returns an error if credentials are missing, the provider rejects the
    /// exchange, or the response does not parse.
    pub async fn exchange_code(
        &self,
        descriptor: &ProviderDescriptor,
        credentials: &OAuthCredentials,
        redirect_uri: &str,
        code: &str,
    ) -> AppResult<String> {
        let provider = descriptor.name;
        let client_id = credentials
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::config(format!("{provider} client_id not configured")))?;
        let client_secret = credentials
            .client_secret
            .as_deref()
            .ok_or_else(|| AppError::config(format!("{provider} client_secret not configured")))?;

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("code", code),
        ];

        let response = self
            .http
            .post(descriptor.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(provider, error = %e, "token exchange request failed");
                AppError::auth_invalid(format!("Token exchange with {provider} failed"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(provider, %status, "token endpoint returned an error");
            return Err(AppError::auth_invalid(format!(
                "Token exchange with {provider} failed"
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            error!(provider, error = %e, "token response did not parse");
            AppError::auth_invalid(format!("Token exchange with {provider} failed"))
        })?;

        Ok(token.access_token)
    }

    /// Fetch the raw user-info payload with a provider access token
    ///
    /// # Errors
    /// Returns an error if the request fails or the payload is not JSON.
    pub async fn fetch_user_info(
        &self,
        descriptor: &ProviderDescriptor,
        access_token: &str,
    ) -> AppResult<Value> {
        let provider = descriptor.name;

        let response = self
            .http
            .get(descriptor.user_info_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!(provider, error = %e, "user-info request failed");
                AppError::auth_invalid(format!("Fetching profile from {provider} failed"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(provider, %status, "user-info endpoint returned an error");
            return Err(AppError::auth_invalid(format!(
                "Fetching profile from {provider} failed"
            )));
        }

        response.json().await.map_err(|e| {
            error!(provider, error = %e, "user-info payload did not parse");
            AppError::auth_invalid(format!("Fetching profile from {provider} failed"))
        })
    }
}

impl Default for OAuthClient {
    fn default() -> Self {
        Self::new()
    }
}
