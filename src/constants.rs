// ABOUTME: Application-wide constants for auth, cookies, and user-facing messages
// ABOUTME: Single place for values shared between the gateway modules and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Application constants

/// Limits and lifetimes
pub mod limits {
    /// Default access-token lifetime when not configured
    pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

    /// Authorization-request cookie lifetime (the login handshake window)
    pub const AUTH_REQUEST_MAX_AGE_SECS: i64 = 180;

    /// Length of the generated OAuth state nonce
    pub const STATE_NONCE_LEN: usize = 32;
}

/// Cookie names and scoping
pub mod cookies {
    /// Name of the authorization-request cookie
    pub const AUTH_REQUEST_COOKIE: &str = "clubroom_auth_request";

    /// Path prefix the authorization-request cookie is scoped to
    pub const AUTH_REQUEST_COOKIE_PATH: &str = "/oauth2";
}

/// User-facing error messages
pub mod error_messages {
    /// Protected route reached without a valid identity
    pub const UNAUTHENTICATED: &str = "Authentication is required to access this resource";

    /// Authenticated identity lacks the required role
    pub const INSUFFICIENT_ROLE: &str = "You do not have permission to access this resource";

    /// A second application while one is pending
    pub const ALREADY_APPLIED: &str = "A membership application is already pending";

    /// Login attempt against a withdrawn account
    pub const ACCOUNT_WITHDRAWN: &str = "This account has been withdrawn";
}
