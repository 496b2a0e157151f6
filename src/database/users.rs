// ABOUTME: User account storage and the find-or-create identity resolver
// ABOUTME: Atomic per (provider, subject id) under concurrent logins via unique constraint + retry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{info, warn};
use uuid::Uuid;

use super::Database;
use crate::constants::error_messages;
use crate::errors::{AppError, AppResult};
use crate::models::{CanonicalIdentity, MemberProfile, User, UserRole};

impl Database {
    /// Resolve a canonical identity to a local user (find-or-create)
    ///
    /// Lookup is by (provider, `provider_subject_id`). On a hit the mutable
    /// profile fields are refreshed ("latest wins" from the provider) and
    /// the role is untouched. On a miss a new account is created at
    /// `initial_role`. Two concurrent first logins for the same external
    /// identity are resolved by the unique constraint: the loser of the
    /// insert race re-reads and updates instead.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The account has been withdrawn (soft-deleted)
    /// - The identity's email is already claimed by a different account
    /// - Database operation fails
    pub async fn find_or_create_user(
        &self,
        identity: &CanonicalIdentity,
        initial_role: UserRole,
    ) -> AppResult<User> {
        if let Some(existing) = self
            .get_user_by_provider_subject(&identity.provider, &identity.provider_subject_id)
            .await?
        {
            return self.login_existing(existing, identity).await;
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            provider: identity.provider.clone(),
            provider_subject_id: identity.provider_subject_id.clone(),
            email: identity.email.clone(),
            display_name: display_name_for(identity),
            avatar_url: identity.avatar_url.clone(),
            role: initial_role,
            phone: None,
            birth_date: None,
            gender: None,
            terms_accepted_at: None,
            created_at: now,
            last_login_at: now,
            deleted_at: None,
        };

        let inserted = sqlx::query(
            r"
            INSERT INTO users (
                id, provider, provider_subject_id, email, display_name,
                avatar_url, role, created_at, last_login_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.provider)
        .bind(&user.provider_subject_id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.last_login_at)
        .execute(self.pool())
        .await;

        match inserted {
            Ok(_) => {
                info!(
                    user_id = %user.id,
                    provider = %user.provider,
                    role = %user.role,
                    "created local user on first login"
                );
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => {
                // Lost the first-login race, or the email is claimed by a
                // different account. Re-read to find out which.
                warn!(
                    provider = %identity.provider,
                    "unique violation on first login, retrying as update"
                );
                let existing = self
                    .get_user_by_provider_subject(
                        &identity.provider,
                        &identity.provider_subject_id,
                    )
                    .await?
                    .ok_or_else(|| {
                        AppError::conflict("Email is already in use by another account")
                    })?;
                self.login_existing(existing, identity).await
            }
            Err(e) => Err(AppError::database(format!("Failed to create user: {e}"))),
        }
    }

    /// Refresh mutable profile fields and the login timestamp for a
    /// returning user
    async fn login_existing(
        &self,
        existing: User,
        identity: &CanonicalIdentity,
    ) -> AppResult<User> {
        if existing.is_withdrawn() {
            return Err(AppError::auth_invalid(error_messages::ACCOUNT_WITHDRAWN));
        }

        // A denied scope leaves the stored value in place rather than
        // blanking it
        let display_name = identity
            .display_name
            .clone()
            .unwrap_or_else(|| existing.display_name.clone());
        let avatar_url = identity.avatar_url.clone().or_else(|| existing.avatar_url.clone());
        let now = Utc::now();

        sqlx::query(
            r"
            UPDATE users SET display_name = $2, avatar_url = $3, last_login_at = $4
            WHERE id = $1
            ",
        )
        .bind(existing.id.to_string())
        .bind(&display_name)
        .bind(&avatar_url)
        .bind(now)
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to refresh user profile: {e}")))?;

        Ok(User {
            display_name,
            avatar_url,
            last_login_at: now,
            ..existing
        })
    }

    /// Get a user by id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(user_id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to get user: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Get a user by its external identity key
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_user_by_provider_subject(
        &self,
        provider: &str,
        provider_subject_id: &str,
    ) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT * FROM users WHERE provider = $1 AND provider_subject_id = $2",
        )
        .bind(provider)
        .bind(provider_subject_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get user by identity: {e}")))?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// Total number of accounts, including withdrawn ones
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn count_users(&self) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {e}")))
    }

    /// Store the onboarding fields and the (possibly promoted) role
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn update_onboarding_profile(
        &self,
        user_id: Uuid,
        phone: &str,
        birth_date: NaiveDate,
        gender: &str,
        terms_accepted_at: DateTime<Utc>,
        role: UserRole,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE users SET
                phone = $2,
                birth_date = $3,
                gender = $4,
                terms_accepted_at = $5,
                role = $6
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(phone)
        .bind(birth_date.to_string())
        .bind(gender)
        .bind(terms_accepted_at)
        .bind(role.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to store onboarding profile: {e}")))?;
        Ok(())
    }

    /// Soft-delete an account (withdrawal)
    ///
    /// The record stays while other records reference it; only the deletion
    /// marker is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn soft_delete_user(&self, user_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
            .bind(user_id.to_string())
            .bind(Utc::now())
            .execute(self.pool())
            .await
            .map_err(|e| AppError::database(format!("Failed to withdraw user: {e}")))?;
        Ok(())
    }

    /// Get the member profile for a user, if membership was granted
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails
    pub async fn get_member_profile(&self, user_id: Uuid) -> AppResult<Option<MemberProfile>> {
        let row = sqlx::query(
            "SELECT user_id, introduction, joined_at FROM member_profiles WHERE user_id = $1",
        )
        .bind(user_id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::database(format!("Failed to get member profile: {e}")))?;

        row.map(|row| {
            let user_id: String = row.get("user_id");
            Ok(MemberProfile {
                user_id: parse_uuid(&user_id)?,
                introduction: row.get("introduction"),
                joined_at: row.get("joined_at"),
            })
        })
        .transpose()
    }
}

/// Convert a database row to a `User`
pub(super) fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    let birth_date: Option<String> = row.get("birth_date");

    Ok(User {
        id: parse_uuid(&id)?,
        provider: row.get("provider"),
        provider_subject_id: row.get("provider_subject_id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        role: UserRole::parse_lossy(&role),
        phone: row.get("phone"),
        birth_date: birth_date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        gender: row.get("gender"),
        terms_accepted_at: row.get("terms_accepted_at"),
        created_at: row.get("created_at"),
        last_login_at: row.get("last_login_at"),
        deleted_at: row.get("deleted_at"),
    })
}

pub(super) fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::internal(format!("Failed to parse stored UUID: {e}")))
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Display name when the provider withheld or omitted one: the email local
/// part, or the provider name as a last resort
fn display_name_for(identity: &CanonicalIdentity) -> String {
    identity.display_name.clone().unwrap_or_else(|| {
        identity
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .unwrap_or(&identity.provider)
            .to_owned()
    })
}
