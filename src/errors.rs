// ABOUTME: Application error type with a machine-readable code taxonomy
// ABOUTME: Renders structured JSON error bodies, never raw messages for server faults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Application errors
//!
//! Every fallible operation in the crate returns [`AppResult`]. User-visible
//! failures carry a structured, machine-parseable body; internal failure
//! detail stays in the logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request lacked a valid authenticated identity
    AuthRequired,
    /// Credentials or token were present but invalid
    AuthInvalid,
    /// Authenticated identity lacks the required role
    PermissionDenied,
    /// Request payload or parameters were malformed
    InvalidInput,
    /// Referenced entity does not exist
    NotFound,
    /// Request conflicts with current state (duplicates, already decided)
    Conflict,
    /// Login redirect target failed origin validation
    RedirectRejected,
    /// Persistence layer failure
    DatabaseError,
    /// Server configuration is missing or invalid
    ConfigError,
    /// Unclassified internal failure
    InternalError,
}

impl ErrorCode {
    /// HTTP status this category maps to
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::RedirectRejected => StatusCode::FORBIDDEN,
            Self::DatabaseError | Self::ConfigError | Self::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable identifier included in error bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::AuthInvalid => "auth_invalid",
            Self::PermissionDenied => "permission_denied",
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RedirectRejected => "redirect_rejected",
            Self::DatabaseError => "database_error",
            Self::ConfigError => "config_error",
            Self::InternalError => "internal_error",
        }
    }
}

/// Application error carrying a category and a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error category
    pub code: ErrorCode,
    /// Human-readable detail (safe to show for 4xx, logged-only for 5xx)
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Invalid credentials or token
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Insufficient role for the requested operation
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    /// Malformed request payload or parameters
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Missing entity
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, format!("{} not found", entity.into()))
    }

    /// State conflict (duplicate application, already-decided application)
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Login redirect target failed the front-end origin allow-list
    pub fn redirect_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RedirectRejected, message)
    }

    /// Persistence failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration failure
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Unclassified internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(format!("Database operation failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();

        // Server faults keep their detail in the logs only
        let message = if status.is_server_error() {
            tracing::error!(code = self.code.as_str(), detail = %self.message, "internal error");
            "Internal server error".to_owned()
        } else {
            self.message
        };

        let body = json!({
            "status": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "code": self.code.as_str(),
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
