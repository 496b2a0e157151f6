// ABOUTME: Current-user route handlers: profile, onboarding, withdrawal, notifications
// ABOUTME: Thin wrappers over the membership service and user store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::auth::CurrentUser;
use crate::errors::{AppError, AppResult};
use crate::membership::{MembershipService, OnboardingForm};
use crate::models::{Notification, User};
use crate::state::ServerState;

/// Sanitized user representation returned to the front end
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User id
    pub user_id: String,
    /// Originating provider
    pub provider: String,
    /// Email, when the provider shared one
    pub email: Option<String>,
    /// Display name
    pub display_name: String,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Current role name
    pub role: String,
    /// Whether the onboarding form has been completed
    pub onboarded: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id.to_string(),
            provider: user.provider,
            email: user.email,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            role: user.role.as_str().to_owned(),
            onboarded: user.terms_accepted_at.is_some(),
        }
    }
}

/// Current-user routes
pub fn routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/users/me",
            get(handle_me).delete(handle_withdraw),
        )
        .route("/api/users/me/onboarding", post(handle_onboarding))
        .route("/api/users/me/notifications", get(handle_notifications))
        .with_state(state)
}

/// The authenticated user's own record
async fn handle_me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<UserResponse>> {
    let record = state
        .database
        .get_user(user.id())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(record.into()))
}

/// Complete (or re-submit) the onboarding form
async fn handle_onboarding(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(form): Json<OnboardingForm>,
) -> AppResult<Json<UserResponse>> {
    let service = MembershipService::new(state.database.clone());
    let updated = service.complete_onboarding(user.id(), &form).await?;
    Ok(Json(updated.into()))
}

/// Withdraw the account (soft delete)
async fn handle_withdraw(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    state.database.soft_delete_user(user.id()).await?;
    info!(user_id = %user.id(), "account withdrawn");
    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user's queued notifications, newest first
async fn handle_notifications(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Notification>>> {
    let notifications = state
        .database
        .list_notifications_for_user(user.id())
        .await?;
    Ok(Json(notifications))
}
