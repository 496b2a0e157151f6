// ABOUTME: Login initiation and provider callback routes with outcome handling
// ABOUTME: Validates redirect targets against the allow-listed front-end origin, fail-closed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Login flow routes
//!
//! `GET /oauth2/authorization/{provider}` starts a login: the handshake
//! state goes into the transient cookie and the user is redirected to the
//! provider. `GET /login/oauth2/code/{provider}` finishes it: the cookie
//! state is consumed, the code exchanged, the payload normalized and
//! resolved to a local user, and a token issued.
//!
//! Outcome handling is asymmetric on purpose. A failed login redirects to
//! the front-end error page with a percent-encoded reason. A success
//! redirect is only issued after the rebuilt target's host and port exactly
//! match the configured front-end origin; a mismatch is a security fault
//! that aborts the request with no redirect at all.

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::{error, info, warn};
use url::Url;
use urlencoding::encode;

use crate::config::environment::FrontendConfig;
use crate::constants::limits;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::membership::initial_role;
use crate::models::User;
use crate::oauth::client::{descriptor, OAuthClient, ProviderDescriptor};
use crate::oauth::request_store::{AuthorizationRequest, AuthorizationRequestStore};
use crate::state::ServerState;

/// Login flow routes, mounted at the root (publicly reachable)
pub fn routes(state: ServerState) -> Router {
    Router::new()
        .route("/oauth2/authorization/:provider", get(handle_authorize))
        .route("/login/oauth2/code/:provider", get(handle_callback))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    /// Front-end path to land on after login
    redirect: Option<String>,
}

/// Start a login: persist handshake state in the cookie, redirect to the
/// provider
async fn handle_authorize(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    Query(params): Query<AuthorizeParams>,
) -> Result<Response, AppError> {
    let descriptor = descriptor(&provider)
        .ok_or_else(|| AppError::invalid_input(format!("Unsupported provider: {provider}")))?;

    let credentials = state
        .config
        .oauth
        .credentials(&provider)
        .ok_or_else(|| AppError::invalid_input(format!("Unsupported provider: {provider}")))?;
    let client_id = credentials
        .client_id
        .as_deref()
        .ok_or_else(|| AppError::config(format!("{provider} client_id not configured")))?;

    let nonce = state_nonce();
    let redirect_uri = state.config.callback_url(&provider);
    let authorization_url =
        OAuthClient::authorization_url(descriptor, client_id, &redirect_uri, &nonce);

    let request = AuthorizationRequest::new(provider.clone(), nonce, params.redirect);
    let mut headers = HeaderMap::new();
    AuthorizationRequestStore::save(Some(&request), &mut headers);

    info!(provider, "login initiated");

    Ok((headers, Redirect::temporary(&authorization_url)).into_response())
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Finish a login: consume the cookie state, exchange the code, resolve the
/// identity, issue a token, and redirect
async fn handle_callback(
    State(state): State<ServerState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    request_headers: HeaderMap,
) -> Response {
    let mut response_headers = HeaderMap::new();
    let stored = AuthorizationRequestStore::remove(&request_headers, &mut response_headers);

    match complete_login(&state, &provider, &params, stored).await {
        Ok(success_url) => {
            info!(provider, "login completed");
            (response_headers, Redirect::temporary(&success_url)).into_response()
        }
        // Redirect-target validation failures are fatal: no silent fallback
        // URL, no redirect at all
        Err(e) if e.code == ErrorCode::RedirectRejected => e.into_response(),
        Err(e) => {
            warn!(provider, reason = %e, "login failed");
            let error_url = failure_redirect(&state.config.frontend, &e.message);
            (response_headers, Redirect::temporary(&error_url)).into_response()
        }
    }
}

async fn complete_login(
    state: &ServerState,
    provider: &str,
    params: &CallbackParams,
    stored: Option<AuthorizationRequest>,
) -> AppResult<String> {
    if let Some(provider_error) = &params.error {
        let reason = params
            .error_description
            .as_deref()
            .unwrap_or(provider_error);
        return Err(AppError::auth_invalid(format!(
            "Provider declined the login: {reason}"
        )));
    }

    let descriptor = descriptor(provider)
        .ok_or_else(|| AppError::invalid_input(format!("Unsupported provider: {provider}")))?;

    // Absent cookie state (expired, cleared, or never set) restarts the
    // login; it is not a hard failure
    let stored = stored.ok_or_else(|| {
        AppError::auth_invalid("Login request expired or missing; please sign in again")
    })?;

    if stored.provider != provider {
        return Err(AppError::auth_invalid(
            "Login request does not match the callback provider",
        ));
    }

    let echoed_state = params
        .state
        .as_deref()
        .ok_or_else(|| AppError::auth_invalid("Callback is missing the state parameter"))?;
    if echoed_state != stored.state {
        warn!(provider, "state nonce mismatch on callback");
        return Err(AppError::auth_invalid("Login state does not match"));
    }

    let code = params
        .code
        .as_deref()
        .ok_or_else(|| AppError::auth_invalid("Callback is missing the authorization code"))?;

    let user = fetch_and_resolve(state, provider, descriptor, code).await?;

    let token = state
        .auth
        .issue(&user, &[user.role.as_str().to_owned()])?;

    build_success_redirect(&state.config.frontend, stored.redirect.as_deref(), &token)
}

/// Exchange the code, fetch and normalize the profile, and resolve it to a
/// local user
async fn fetch_and_resolve(
    state: &ServerState,
    provider: &str,
    descriptor: &ProviderDescriptor,
    code: &str,
) -> AppResult<User> {
    let credentials = state
        .config
        .oauth
        .credentials(provider)
        .ok_or_else(|| AppError::invalid_input(format!("Unsupported provider: {provider}")))?;

    let redirect_uri = state.config.callback_url(provider);
    let access_token = state
        .oauth
        .exchange_code(descriptor, credentials, &redirect_uri, code)
        .await?;

    let payload = state
        .oauth
        .fetch_user_info(descriptor, &access_token)
        .await?;

    let identity = state
        .normalizers
        .normalize(provider, descriptor.subject_id_key, &payload)?;

    let role = initial_role(state.config.auth.signup_auto_promote);
    state.database.find_or_create_user(&identity, role).await
}

/// Rebuild the front-end success URL with the token, validating the result
/// against the allow-listed origin
///
/// The redirect path comes from the client (via the handshake cookie), so
/// the rebuilt target is checked for exact scheme/host/port equality with
/// the configured origin. A mismatch aborts the login, fail-closed.
///
/// # Errors
/// Returns a `RedirectRejected` error when the target escapes the origin.
pub fn build_success_redirect(
    frontend: &FrontendConfig,
    redirect_path: Option<&str>,
    token: &str,
) -> AppResult<String> {
    let allowed = Url::parse(&frontend.origin)
        .map_err(|e| AppError::config(format!("Invalid front-end origin: {e}")))?;

    let path = redirect_path.unwrap_or(&frontend.login_success_path);
    let mut target = allowed
        .join(path)
        .map_err(|_| AppError::redirect_rejected("Login redirect target does not parse"))?;

    if target.scheme() != allowed.scheme()
        || target.host_str() != allowed.host_str()
        || target.port_or_known_default() != allowed.port_or_known_default()
    {
        error!(
            security = true,
            target = %target,
            origin = %allowed,
            "login redirect target escaped the allow-listed front-end origin"
        );
        return Err(AppError::redirect_rejected(
            "Login redirect target is not allow-listed",
        ));
    }

    target.query_pairs_mut().append_pair("token", token);
    Ok(target.into())
}

/// Front-end error URL carrying a percent-encoded failure reason
#[must_use]
pub fn failure_redirect(frontend: &FrontendConfig, reason: &str) -> String {
    format!(
        "{}{}?error={}",
        frontend.origin,
        frontend.login_error_path,
        encode(reason)
    )
}

fn state_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(limits::STATE_NONCE_LEN)
        .map(char::from)
        .collect()
}
