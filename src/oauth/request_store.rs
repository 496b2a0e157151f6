// ABOUTME: Cookie-held transient store for the in-flight login handshake
// ABOUTME: Versioned payload, 180s TTL, path-scoped; replaces server-side session storage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Authorization-request transient store
//!
//! The brief window between login initiation and provider callback needs a
//! little state (provider, CSRF nonce, post-login redirect). Instead of a
//! server-side session (which would require affinity or replication) the
//! state rides in a short-lived client-held cookie, path-scoped to the login
//! prefix. The payload is a versioned, self-describing serialization so a
//! format change doesn't break logins in flight across a deploy.
//!
//! A corrupt or absent cookie is never an error: `load` returns `None` and
//! the login flow restarts cleanly. `remove` expires the cookie eagerly on
//! consumption, closing the replay window the TTL alone would leave open.

use std::env;
use std::fmt::Write as _;

use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{cookies, limits};

/// Current cookie payload format version
const PAYLOAD_VERSION: u8 = 1;

/// State correlating a login's outbound redirect with its inbound callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Payload format version; mismatches are treated as absent state
    pub version: u8,
    /// Provider the login was initiated against
    pub provider: String,
    /// CSRF state nonce echoed back by the provider
    pub state: String,
    /// Front-end path to land on after login, if the client asked for one
    pub redirect: Option<String>,
    /// Initiation time
    pub created_at: DateTime<Utc>,
}

impl AuthorizationRequest {
    /// New in-flight request state at the current format version
    #[must_use]
    pub fn new(provider: String, state: String, redirect: Option<String>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            provider,
            state,
            redirect,
            created_at: Utc::now(),
        }
    }
}

/// Stateless store over the client-held cookie
pub struct AuthorizationRequestStore;

impl AuthorizationRequestStore {
    /// Persist `request` into the response's Set-Cookie header
    ///
    /// `None` clears the cookie, supporting cancel/retry flows.
    pub fn save(request: Option<&AuthorizationRequest>, response_headers: &mut HeaderMap) {
        let cookie = match request {
            Some(state) => build_cookie(&encode_payload(state), limits::AUTH_REQUEST_MAX_AGE_SECS),
            None => build_cookie("", 0),
        };

        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response_headers.append(header::SET_COOKIE, value);
        }
    }

    /// Read the in-flight request state, if any
    ///
    /// Absent or corrupt cookies yield `None`; a fresh login is always
    /// preferable to a hard failure here.
    #[must_use]
    pub fn load(request_headers: &HeaderMap) -> Option<AuthorizationRequest> {
        let raw = cookie_value(request_headers, cookies::AUTH_REQUEST_COOKIE)?;
        decode_payload(&raw)
    }

    /// Consume the in-flight request state
    ///
    /// Returns the state as `load` would, and eagerly expires the cookie on
    /// the response so the same authorization request cannot be replayed
    /// within the remaining TTL.
    #[must_use]
    pub fn remove(
        request_headers: &HeaderMap,
        response_headers: &mut HeaderMap,
    ) -> Option<AuthorizationRequest> {
        let state = Self::load(request_headers);
        if state.is_some() {
            Self::save(None, response_headers);
        }
        state
    }
}

fn encode_payload(state: &AuthorizationRequest) -> String {
    // Serialization of a plain struct cannot fail
    let json = serde_json::to_vec(state).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_payload(raw: &str) -> Option<AuthorizationRequest> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw)
        .map_err(|e| debug!(error = %e, "authorization-request cookie is not valid base64"))
        .ok()?;
    let state: AuthorizationRequest = serde_json::from_slice(&bytes)
        .map_err(|e| debug!(error = %e, "authorization-request cookie does not deserialize"))
        .ok()?;

    if state.version == PAYLOAD_VERSION {
        Some(state)
    } else {
        debug!(
            version = state.version,
            expected = PAYLOAD_VERSION,
            "authorization-request cookie has an unknown payload version"
        );
        None
    }
}

fn build_cookie(value: &str, max_age_secs: i64) -> String {
    let mut cookie = format!("{}={value}", cookies::AUTH_REQUEST_COOKIE);
    let _ = write!(cookie, "; Max-Age={max_age_secs}");
    let _ = write!(cookie, "; Path={}", cookies::AUTH_REQUEST_COOKIE_PATH);
    cookie.push_str("; HttpOnly");
    cookie.push_str("; SameSite=Lax");
    if infer_secure_flag() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Derive the Secure cookie flag from the `BASE_URL` environment variable
///
/// `https://` (or unset) sets Secure; plain-HTTP development setups don't.
fn infer_secure_flag() -> bool {
    env::var("BASE_URL").map_or(true, |url| !url.starts_with("http://"))
}

/// Extract a cookie value from request headers
#[must_use]
pub fn cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let mut parts = cookie.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            let value = parts.next()?.trim();
            (name == cookie_name).then(|| value.to_owned())
        })
}
