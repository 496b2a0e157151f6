// ABOUTME: Shared immutable server state threaded through every route handler
// ABOUTME: Holds config, database pool, token manager, OAuth client, and normalizers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Server state
//!
//! Everything in here is immutable after startup (the signing key is loaded
//! once from configuration; the normalizer registry is fixed). Cloning is
//! cheap: `Arc`s and a pool handle.

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::environment::ServerConfig;
use crate::database::Database;
use crate::errors::AppResult;
use crate::oauth::client::OAuthClient;
use crate::oauth::normalizer::NormalizerRegistry;

/// Shared state handed to every handler via axum `State`
#[derive(Clone)]
pub struct ServerState {
    /// Immutable server configuration
    pub config: Arc<ServerConfig>,
    /// Persistence layer
    pub database: Database,
    /// Token issuer/validator
    pub auth: Arc<AuthManager>,
    /// OAuth2 code-exchange client
    pub oauth: Arc<OAuthClient>,
    /// Provider payload normalization registry
    pub normalizers: Arc<NormalizerRegistry>,
}

impl ServerState {
    /// Assemble server state from loaded configuration and a connected
    /// database
    ///
    /// # Errors
    /// Returns an error if the JWT secret does not decode.
    pub fn new(config: ServerConfig, database: Database) -> AppResult<Self> {
        let auth = AuthManager::new(
            &config.auth.jwt_secret_base64,
            config.auth.token_lifetime_secs,
        )?;

        Ok(Self {
            config: Arc::new(config),
            database,
            auth: Arc::new(auth),
            oauth: Arc::new(OAuthClient::new()),
            normalizers: Arc::new(NormalizerRegistry::new()),
        })
    }
}
