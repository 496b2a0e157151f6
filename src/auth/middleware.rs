// ABOUTME: Per-request authentication filter and route-level identity extractors
// ABOUTME: Establishes identity from bearer tokens; rejection happens downstream per route
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Authentication filter and extractors
//!
//! The filter runs once per inbound request. A valid bearer token becomes a
//! request-scoped [`AuthIdentity`]; anything else (missing header, garbage,
//! expired token) leaves the request unauthenticated and lets it continue:
//! this layer establishes identity, it never enforces policy. Enforcement
//! lives in the [`CurrentUser`] / [`RequireMember`] / [`RequireAdmin`]
//! extractors, which produce the uniform structured 401/403 rejection.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::auth::manager::AuthIdentity;
use crate::constants::error_messages;
use crate::models::UserRole;
use crate::state::ServerState;

/// Authentication filter, applied to the whole router
///
/// Reads the `Authorization` header, strips the `Bearer ` prefix, and, when
/// validation succeeds, attaches an [`AuthIdentity`] extension. Failures are
/// logged and the request continues unauthenticated.
pub async fn authentication_filter(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match state.auth.authenticate(token) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
            }
            Err(reason) => {
                debug!(reason = %reason, path = request.uri().path(), "bearer token rejected");
            }
        }
    }

    next.run(request).await
}

/// Extract the bearer token from the `Authorization` header, if any
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Uniform structured rejection for unauthenticated or under-privileged access
#[derive(Debug, Serialize)]
pub struct AccessRejection {
    status: u16,
    error: &'static str,
    message: &'static str,
    path: String,
}

impl AccessRejection {
    fn unauthenticated(path: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED.as_u16(),
            error: "Unauthorized",
            message: error_messages::UNAUTHENTICATED,
            path: path.to_owned(),
        }
    }

    fn forbidden(path: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN.as_u16(),
            error: "Forbidden",
            message: error_messages::INSUFFICIENT_ROLE,
            path: path.to_owned(),
        }
    }
}

impl IntoResponse for AccessRejection {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// The authenticated caller, available on any route behind the filter
///
/// This is the identity surface downstream services consume: an opaque user
/// id and the set of granted role names, both taken from the validated
/// token with no database round-trip.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    user_id: Uuid,
    roles: Vec<String>,
}

impl CurrentUser {
    /// The authenticated user's id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.user_id
    }

    /// Role names granted by the token
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Whether any granted role satisfies `required`
    #[must_use]
    pub fn has_role(&self, required: UserRole) -> bool {
        self.roles
            .iter()
            .filter_map(|r| UserRole::parse(r))
            .any(|r| r.satisfies(required))
    }
}

impl From<AuthIdentity> for CurrentUser {
    fn from(identity: AuthIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            roles: identity.roles,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthIdentity>()
            .cloned()
            .map(Self::from)
            .ok_or_else(|| AccessRejection::unauthenticated(parts.uri.path()))
    }
}

/// Extractor requiring the MEMBER tier or better
#[derive(Debug, Clone)]
pub struct RequireMember(pub CurrentUser);

/// Extractor requiring the ADMIN tier
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentUser);

async fn require_role<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
    required: UserRole,
) -> Result<CurrentUser, AccessRejection> {
    let user = CurrentUser::from_request_parts(parts, state).await?;
    if user.has_role(required) {
        Ok(user)
    } else {
        Err(AccessRejection::forbidden(parts.uri.path()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireMember
where
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Member).await.map(Self)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AccessRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        require_role(parts, state, UserRole::Admin).await.map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_token_strips_prefix() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_token_rejects_other_schemes_and_blanks() {
        assert_eq!(bearer_token(&headers_with_auth("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers_with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
