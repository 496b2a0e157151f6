// ABOUTME: Configuration module organization
// ABOUTME: Environment-only configuration loaded once at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Configuration
//!
//! Clubroom is configured entirely from the environment; there is no config
//! file. [`environment::ServerConfig::from_env`] is called once at startup
//! and the result is held immutably for the life of the process.

/// Environment variable parsing into [`environment::ServerConfig`]
pub mod environment;
