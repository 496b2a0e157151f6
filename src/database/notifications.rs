// ABOUTME: Durable notification queue consumed by membership transitions
// ABOUTME: Enqueue and per-user listing; delivery is a downstream concern
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::users::parse_uuid;
use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::Notification;

impl Database {
    /// Enqueue a notification for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn enqueue_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
    ) -> AppResult<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO notifications (user_id, kind, message, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(user_id.to_string())
        .bind(kind)
        .bind(message)
        .bind(Utc::now())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to enqueue notification: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Notifications for a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn list_notifications_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to list notifications: {e}")))?;

        rows.iter()
            .map(|row| {
                let user_id: String = row.get("user_id");
                Ok(Notification {
                    id: row.get("id"),
                    user_id: parse_uuid(&user_id)?,
                    kind: row.get("kind"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}
