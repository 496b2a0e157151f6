// ABOUTME: Main library entry point for the Clubroom membership backend
// ABOUTME: Provides federated login, stateless token auth, and role-gated REST APIs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

#![deny(unsafe_code)]

//! # Clubroom
//!
//! Backend for a membership community website. The interesting part is the
//! authentication and authorization gateway: federated login against Kakao,
//! Naver, and Google; short-lived self-contained HS512 bearer tokens; a
//! cookie-held authorization-request store (no server-side session state);
//! and a progressive role state machine (GUEST → USER → MEMBER → ADMIN)
//! that every API route's authorization check hangs off of.
//!
//! ## Architecture
//!
//! - **`oauth`**: provider descriptors, authorization-code exchange, identity
//!   normalization, and the login initiation/callback routes
//! - **`auth`**: token issuing/validation and the per-request authentication
//!   filter that establishes the request identity
//! - **`membership`**: the role state machine and its transitions
//! - **`database`**: `sqlx`-backed persistence (users, applications,
//!   member profiles, notifications)
//! - **`routes`**: HTTP surface; thin handlers delegating to services
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clubroom::config::environment::ServerConfig;
//! use clubroom::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Clubroom configured with port: HTTP={}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Token issuing/validation and the request authentication filter
pub mod auth;

/// Configuration management (environment-only)
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Persistence layer over `sqlx` SQLite
pub mod database;

/// Application error type and HTTP error rendering
pub mod errors;

/// Role state machine and membership application workflow
pub mod membership;

/// Common data models for accounts and membership
pub mod models;

/// Federated login: providers, normalization, and login flow routes
pub mod oauth;

/// HTTP routes for the API surface
pub mod routes;

/// Shared immutable server state handed to every handler
pub mod state;
