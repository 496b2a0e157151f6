// ABOUTME: Route module organization and top-level router assembly
// ABOUTME: Public login routes, role-gated API routes, authentication filter wiring
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! HTTP routes
//!
//! `/oauth2/**` and `/login/**` are always publicly reachable; every `/api`
//! route sits behind the authentication filter and rejects per its own role
//! requirement (deny by default; a route without an identity extractor
//! simply does not exist under `/api`). Handlers are thin and delegate to
//! service layers.

/// Membership application and admin decision routes
pub mod membership;

/// Current-user routes (profile, onboarding, withdrawal, notifications)
pub mod users;

use axum::{middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::auth::authentication_filter;
use crate::state::ServerState;

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(crate::oauth::routes::routes(state.clone()))
        .merge(users::routes(state.clone()))
        .merge(membership::routes(state.clone()))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(
            state,
            authentication_filter,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Liveness probe
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
