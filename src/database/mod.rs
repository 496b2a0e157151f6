// ABOUTME: Core database management with schema setup over sqlx SQLite
// ABOUTME: Handles users, membership applications, member profiles, and notifications
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Persistence layer
//!
//! A thin `Database` handle over a `sqlx` SQLite pool. The schema is created
//! idempotently at connect time. The only genuinely racy operation in the
//! system (concurrent first logins for the same external identity) is
//! resolved here with a unique constraint plus retry, not an application
//! lock, because requests may be served by independent processes.

/// Membership application storage and the transactional approval path
pub mod applications;
/// Durable notification queue
pub mod notifications;
/// User account storage and the find-or-create identity resolver
pub mod users;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};

/// Idempotent schema statements run at connect time
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        provider TEXT NOT NULL,
        provider_subject_id TEXT NOT NULL,
        email TEXT,
        display_name TEXT NOT NULL,
        avatar_url TEXT,
        role TEXT NOT NULL,
        phone TEXT,
        birth_date TEXT,
        gender TEXT,
        terms_accepted_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL,
        last_login_at TIMESTAMP NOT NULL,
        deleted_at TIMESTAMP,
        UNIQUE (provider, provider_subject_id)
    )",
    // Email uniqueness only applies to live accounts; withdrawn accounts
    // keep their email for audit but release the claim on it
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_live_email
        ON users (email) WHERE email IS NOT NULL AND deleted_at IS NULL",
    "CREATE TABLE IF NOT EXISTS join_applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users (id),
        introduction TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING',
        decided_by TEXT,
        decided_at TIMESTAMP,
        created_at TIMESTAMP NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_applications_user_status
        ON join_applications (user_id, status)",
    "CREATE TABLE IF NOT EXISTS member_profiles (
        user_id TEXT PRIMARY KEY REFERENCES users (id),
        introduction TEXT NOT NULL,
        joined_at TIMESTAMP NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL REFERENCES users (id),
        kind TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL
    )",
];

/// Database connection pool handle
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and prepare the schema
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database URL is invalid or malformed
    /// - Database connection fails
    /// - Schema creation fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains(":memory:")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        // A pooled in-memory database is one database per connection; cap
        // the pool so tests against sqlite::memory: see a single database
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&connection_options)
            .await
            .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Schema creation failed: {e}")))?;
        }
        Ok(())
    }

    /// The underlying pool
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
