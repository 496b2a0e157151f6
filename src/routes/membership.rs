// ABOUTME: Membership application routes: submit, list pending, approve, reject
// ABOUTME: Decisions are ADMIN-only; approval runs the transactional promotion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{CurrentUser, RequireAdmin, RequireMember};
use crate::errors::{AppError, AppResult};
use crate::membership::MembershipService;
use crate::models::{JoinApplication, MemberProfile};
use crate::state::ServerState;

/// Application representation returned to clients
#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    /// Application id
    pub id: i64,
    /// Applicant user id
    pub user_id: String,
    /// Applicant's self-introduction
    pub introduction: String,
    /// Lifecycle state
    pub status: String,
    /// Submission time
    pub created_at: String,
}

impl From<JoinApplication> for ApplicationResponse {
    fn from(application: JoinApplication) -> Self {
        Self {
            id: application.id,
            user_id: application.user_id.to_string(),
            introduction: application.introduction,
            status: application.status.as_str().to_owned(),
            created_at: application.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    introduction: String,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    reason: Option<String>,
}

/// Membership routes
pub fn routes(state: ServerState) -> Router {
    Router::new()
        .route(
            "/api/membership/applications",
            post(handle_apply).get(handle_pending),
        )
        .route("/api/membership/profile", get(handle_member_profile))
        .route(
            "/api/admin/applications/:id/approve",
            post(handle_approve),
        )
        .route("/api/admin/applications/:id/reject", post(handle_reject))
        .with_state(state)
}

/// The caller's member profile (MEMBER or better)
async fn handle_member_profile(
    State(state): State<ServerState>,
    RequireMember(member): RequireMember,
) -> AppResult<Json<MemberProfile>> {
    let profile = state
        .database
        .get_member_profile(member.id())
        .await?
        .ok_or_else(|| AppError::not_found("Member profile"))?;
    Ok(Json(profile))
}

/// Submit a membership application
async fn handle_apply(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(request): Json<ApplyRequest>,
) -> AppResult<impl IntoResponse> {
    let service = MembershipService::new(state.database.clone());
    let application = service
        .submit_application(user.id(), &request.introduction)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::from(application)),
    ))
}

/// List applications awaiting a decision (ADMIN)
async fn handle_pending(
    State(state): State<ServerState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<Json<Vec<ApplicationResponse>>> {
    let service = MembershipService::new(state.database.clone());
    let pending = service.pending_applications().await?;

    Ok(Json(
        pending.into_iter().map(ApplicationResponse::from).collect(),
    ))
}

/// Approve a pending application (ADMIN)
async fn handle_approve(
    State(state): State<ServerState>,
    RequireAdmin(admin): RequireAdmin,
    Path(application_id): Path<i64>,
) -> AppResult<Json<ApplicationResponse>> {
    let service = MembershipService::new(state.database.clone());
    let decided = service.approve(application_id, admin.id()).await?;
    Ok(Json(decided.into()))
}

/// Reject a pending application (ADMIN)
async fn handle_reject(
    State(state): State<ServerState>,
    RequireAdmin(admin): RequireAdmin,
    Path(application_id): Path<i64>,
    Json(request): Json<RejectRequest>,
) -> AppResult<Json<ApplicationResponse>> {
    let service = MembershipService::new(state.database.clone());
    let decided = service
        .reject(application_id, admin.id(), request.reason.as_deref())
        .await?;
    Ok(Json(decided.into()))
}
