// ABOUTME: HS512 access-token issuing, validation, and claim parsing
// ABOUTME: Self-contained tokens carrying user id, email, and a comma-joined role list
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Token issuer/validator
//!
//! Tokens are signed with an HMAC-SHA-512 key decoded from a base64 secret,
//! loaded once at startup and held immutably; validity is determined purely
//! by signature and expiry. Validation failures are distinguishable in the
//! logs but deliberately not to callers of [`AuthManager::validate`]
//! (uniform boolean, no oracle).

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::User;

/// Separator for the role list claim; role names must never contain it
const ROLE_SEPARATOR: char = ',';

/// Why a token was rejected
///
/// Consumed by the authentication filter to decide whether to establish a
/// request identity; the category never reaches the client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Expiry has passed
    #[error("token expired")]
    Expired,
    /// Signature does not verify against the signing key
    #[error("invalid signature")]
    InvalidSignature,
    /// Signed with an algorithm other than HS512
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    /// Structurally invalid (not a JWT, bad base64, missing claims)
    #[error("malformed token")]
    Malformed,
    /// Subject claim is not a valid user id
    #[error("invalid subject claim")]
    InvalidSubject,
}

/// Request-scoped identity established by a successfully validated token
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    /// Authenticated user id
    pub user_id: Uuid,
    /// Role names granted by the token
    pub roles: Vec<String>,
}

/// Signed token claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id
    sub: String,
    /// Email at issuance time (may be empty when the account has none)
    email: String,
    /// Comma-joined role list
    roles: String,
    /// Issued-at (seconds since epoch)
    iat: i64,
    /// Expiry (seconds since epoch)
    exp: i64,
}

/// Issues and validates access tokens
///
/// Stateless and cheap to share; the only state is the immutable key pair
/// derived from the configured secret.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_lifetime: Duration,
}

impl AuthManager {
    /// Build a manager from a base64-encoded secret
    ///
    /// # Errors
    /// Returns an error if the secret is not valid base64.
    pub fn new(jwt_secret_base64: &str, token_lifetime_secs: i64) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_base64_secret(jwt_secret_base64)
            .map_err(|e| AppError::config(format!("Invalid JWT secret: {e}")))?;
        let decoding_key = DecodingKey::from_base64_secret(jwt_secret_base64)
            .map_err(|e| AppError::config(format!("Invalid JWT secret: {e}")))?;

        let mut validation = Validation::new(Algorithm::HS512);
        // Expiry is exact; the configured lifetime is the whole grace period
        validation.leeway = 0;
        validation.validate_exp = true;

        Ok(Self {
            encoding_key,
            decoding_key,
            validation,
            token_lifetime: Duration::seconds(token_lifetime_secs),
        })
    }

    /// Issue a signed token for `user` carrying `roles`
    ///
    /// # Errors
    /// Returns an error if a role name contains the list separator or
    /// signing fails.
    pub fn issue(&self, user: &User, roles: &[String]) -> AppResult<String> {
        if let Some(bad) = roles.iter().find(|r| r.contains(ROLE_SEPARATOR)) {
            return Err(AppError::internal(format!(
                "Role name may not contain '{ROLE_SEPARATOR}': {bad}"
            )));
        }

        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone().unwrap_or_default(),
            roles: roles.join(&ROLE_SEPARATOR.to_string()),
            iat: now.timestamp(),
            exp: (now + self.token_lifetime).timestamp(),
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    /// Validate and decode a token into a request identity
    ///
    /// This is the filter-facing entry point: an explicit result instead of
    /// a boolean, so the caller can log the rejection reason without
    /// exposing it.
    ///
    /// # Errors
    /// Returns the rejection category; see [`TokenError`].
    pub fn authenticate(&self, token: &str) -> Result<AuthIdentity, TokenError> {
        let claims = self.decode_claims(token)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::InvalidSubject)?;
        let roles = claims
            .roles
            .split(ROLE_SEPARATOR)
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(AuthIdentity { user_id, roles })
    }

    /// Whether a token is valid (signature, structure, expiry)
    ///
    /// Uniform boolean by design: each failure category is logged but the
    /// caller cannot distinguish them.
    #[must_use]
    pub fn validate(&self, token: &str) -> bool {
        match self.decode_claims(token) {
            Ok(_) => true,
            Err(reason) => {
                info!(reason = %reason, "token rejected");
                false
            }
        }
    }

    /// Extract the subject and role claims of an already-validated token
    ///
    /// Must not be called without a preceding successful
    /// [`AuthManager::validate`]; an invalid token yields an error here too,
    /// but without the categorized logging of the validation path.
    ///
    /// # Errors
    /// Returns an error if the token does not decode.
    pub fn parse(&self, token: &str) -> AppResult<(Uuid, Vec<String>)> {
        let identity = self
            .authenticate(token)
            .map_err(|e| AppError::auth_invalid(format!("Token does not parse: {e}")))?;
        Ok((identity.user_id, identity.roles))
    }

    fn decode_claims(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
                _ => TokenError::Malformed,
            }),
        }
    }
}
