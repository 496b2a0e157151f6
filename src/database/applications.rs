// ABOUTME: Membership application storage and the transactional approval path
// ABOUTME: Application status, user role, member profile, and notification move as one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;
use uuid::Uuid;

use super::users::parse_uuid;
use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{ApplicationStatus, JoinApplication};

impl Database {
    /// Submit a new membership application
    ///
    /// The duplicate-PENDING policy check lives in the membership service;
    /// this is the raw insert.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn create_application(
        &self,
        user_id: Uuid,
        introduction: &str,
    ) -> AppResult<JoinApplication> {
        let now = Utc::now();
        let result = sqlx::query(
            r"
            INSERT INTO join_applications (user_id, introduction, status, created_at)
            VALUES ($1, $2, 'PENDING', $3)
            ",
        )
        .bind(user_id.to_string())
        .bind(introduction)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to create application: {e}")))?;

        Ok(JoinApplication {
            id: result.last_insert_rowid(),
            user_id,
            introduction: introduction.to_owned(),
            status: ApplicationStatus::Pending,
            decided_by: None,
            decided_at: None,
            created_at: now,
        })
    }

    /// Get an application by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_application(&self, application_id: i64) -> AppResult<Option<JoinApplication>> {
        let row = sqlx::query("SELECT * FROM join_applications WHERE id = $1")
            .bind(application_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to get application: {e}")))?;

        row.as_ref().map(row_to_application).transpose()
    }

    /// Get a user's PENDING application, if one exists
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_pending_application_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<JoinApplication>> {
        let row = sqlx::query(
            "SELECT * FROM join_applications WHERE user_id = $1 AND status = 'PENDING'",
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get pending application: {e}")))?;

        row.as_ref().map(row_to_application).transpose()
    }

    /// List applications in a given state, oldest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_applications_by_status(
        &self,
        status: ApplicationStatus,
    ) -> AppResult<Vec<JoinApplication>> {
        let rows = sqlx::query(
            "SELECT * FROM join_applications WHERE status = $1 ORDER BY created_at ASC",
        )
        .bind(status.as_str())
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list applications: {e}")))?;

        rows.iter().map(row_to_application).collect()
    }

    /// Approve a PENDING application
    ///
    /// One transaction covers the whole transition: the application flips to
    /// APPROVED, the applicant's role advances to MEMBER, a member profile
    /// seeded from the application is created if absent, and exactly one
    /// approval notification is enqueued. Approving the application without
    /// promoting the user (or vice versa) would violate the state machine,
    /// so partial outcomes are impossible by construction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The application does not exist
    /// - The application has already been decided
    /// - Database operation fails
    pub async fn approve_application(
        &self,
        application_id: i64,
        decided_by: Uuid,
        notification_message: &str,
    ) -> AppResult<JoinApplication> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let application = fetch_undecided(&mut tx, application_id).await?;
        let now = Utc::now();

        sqlx::query(
            r"
            UPDATE join_applications
            SET status = 'APPROVED', decided_by = $2, decided_at = $3
            WHERE id = $1
            ",
        )
        .bind(application_id)
        .bind(decided_by.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to approve application: {e}")))?;

        // Forward-only: never demote an already-MEMBER or ADMIN account
        sqlx::query(
            "UPDATE users SET role = 'MEMBER' WHERE id = $1 AND role IN ('GUEST', 'USER')",
        )
        .bind(application.user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to promote user: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO member_profiles (user_id, introduction, joined_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(application.user_id.to_string())
        .bind(&application.introduction)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create member profile: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO notifications (user_id, kind, message, created_at)
            VALUES ($1, 'membership.approved', $2, $3)
            ",
        )
        .bind(application.user_id.to_string())
        .bind(notification_message)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to enqueue notification: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit approval: {e}")))?;

        info!(
            application_id,
            user_id = %application.user_id,
            decided_by = %decided_by,
            "membership application approved"
        );

        Ok(JoinApplication {
            status: ApplicationStatus::Approved,
            decided_by: Some(decided_by),
            decided_at: Some(now),
            ..application
        })
    }

    /// Reject a PENDING application
    ///
    /// The applicant's role is left unchanged; the application reaches the
    /// terminal REJECTED state and a rejection notification is enqueued, in
    /// one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The application does not exist
    /// - The application has already been decided
    /// - Database operation fails
    pub async fn reject_application(
        &self,
        application_id: i64,
        decided_by: Uuid,
        notification_message: &str,
    ) -> AppResult<JoinApplication> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {e}")))?;

        let application = fetch_undecided(&mut tx, application_id).await?;
        let now = Utc::now();

        sqlx::query(
            r"
            UPDATE join_applications
            SET status = 'REJECTED', decided_by = $2, decided_at = $3
            WHERE id = $1
            ",
        )
        .bind(application_id)
        .bind(decided_by.to_string())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to reject application: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO notifications (user_id, kind, message, created_at)
            VALUES ($1, 'membership.rejected', $2, $3)
            ",
        )
        .bind(application.user_id.to_string())
        .bind(notification_message)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to enqueue notification: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit rejection: {e}")))?;

        info!(
            application_id,
            user_id = %application.user_id,
            decided_by = %decided_by,
            "membership application rejected"
        );

        Ok(JoinApplication {
            status: ApplicationStatus::Rejected,
            decided_by: Some(decided_by),
            decided_at: Some(now),
            ..application
        })
    }
}

async fn fetch_undecided(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    application_id: i64,
) -> AppResult<JoinApplication> {
    let row = sqlx::query("SELECT * FROM join_applications WHERE id = $1")
        .bind(application_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to get application: {e}")))?
        .ok_or_else(|| AppError::not_found("Application"))?;

    let application = row_to_application(&row)?;
    if application.status != ApplicationStatus::Pending {
        return Err(AppError::conflict(
            "Application has already been decided",
        ));
    }
    Ok(application)
}

fn row_to_application(row: &SqliteRow) -> AppResult<JoinApplication> {
    let user_id: String = row.get("user_id");
    let status: String = row.get("status");
    let decided_by: Option<String> = row.get("decided_by");

    Ok(JoinApplication {
        id: row.get("id"),
        user_id: parse_uuid(&user_id)?,
        introduction: row.get("introduction"),
        status: ApplicationStatus::parse(&status).ok_or_else(|| {
            AppError::internal(format!("Unknown application status in database: {status}"))
        })?,
        decided_by: decided_by.as_deref().map(parse_uuid).transpose()?,
        decided_at: row.get("decided_at"),
        created_at: row.get("created_at"),
    })
}
