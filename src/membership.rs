// ABOUTME: Role state machine service: onboarding, applications, approval, rejection
// ABOUTME: GUEST to USER to MEMBER progression; ADMIN is operator-granted out of band
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Membership workflow
//!
//! The role ladder advances in exactly two places: completing the one-time
//! onboarding form (GUEST → USER) and an administrator approving a pending
//! application (USER → MEMBER). Both are idempotent or guarded: onboarding
//! re-submission overwrites the same fields without touching a USER+ role,
//! and a decided application can never be decided again. There is no
//! downward transition anywhere in the service.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::constants::error_messages;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{ApplicationStatus, JoinApplication, User, UserRole};

/// Role assigned to first-time logins
///
/// Product policy: auto-promotion (the default) creates accounts at USER;
/// otherwise they start at GUEST and must complete onboarding.
#[must_use]
pub fn initial_role(signup_auto_promote: bool) -> UserRole {
    if signup_auto_promote {
        UserRole::User
    } else {
        UserRole::Guest
    }
}

/// One-time onboarding form collected to leave the GUEST tier
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingForm {
    /// Contact phone number
    pub phone: String,
    /// Birth date (ISO `YYYY-MM-DD`)
    pub birth_date: NaiveDate,
    /// Self-reported gender
    pub gender: String,
    /// Terms-of-service acceptance; must be true
    pub terms_accepted: bool,
}

/// Membership workflow service over the database
#[derive(Clone)]
pub struct MembershipService {
    database: Database,
}

impl MembershipService {
    /// Creates a new membership service
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Complete (or re-submit) the onboarding form
    ///
    /// Idempotent: fields are overwritten on re-submission; the role only
    /// changes on the first completion, GUEST → USER. A USER, MEMBER, or
    /// ADMIN keeps their role.
    ///
    /// # Errors
    /// Returns an error if the terms were not accepted, the user does not
    /// exist or is withdrawn, or persistence fails.
    #[tracing::instrument(skip(self, form), fields(user_id = %user_id))]
    pub async fn complete_onboarding(
        &self,
        user_id: Uuid,
        form: &OnboardingForm,
    ) -> AppResult<User> {
        if !form.terms_accepted {
            return Err(AppError::invalid_input(
                "The terms of service must be accepted",
            ));
        }

        let user = self.live_user(user_id).await?;

        let role = if user.role == UserRole::Guest {
            info!(user_id = %user.id, "onboarding complete, promoting GUEST to USER");
            UserRole::User
        } else {
            user.role
        };

        let accepted_at = user.terms_accepted_at.unwrap_or_else(Utc::now);
        self.database
            .update_onboarding_profile(
                user_id,
                &form.phone,
                form.birth_date,
                &form.gender,
                accepted_at,
                role,
            )
            .await?;

        Ok(User {
            phone: Some(form.phone.clone()),
            birth_date: Some(form.birth_date),
            gender: Some(form.gender.clone()),
            terms_accepted_at: Some(accepted_at),
            role,
            ..user
        })
    }

    /// Submit a membership application
    ///
    /// # Errors
    /// Returns an error if the user is still a GUEST (onboarding first), is
    /// already a MEMBER or better, or already holds a PENDING application.
    #[tracing::instrument(skip(self, introduction), fields(user_id = %user_id))]
    pub async fn submit_application(
        &self,
        user_id: Uuid,
        introduction: &str,
    ) -> AppResult<JoinApplication> {
        let user = self.live_user(user_id).await?;

        if user.role == UserRole::Guest {
            return Err(AppError::forbidden(
                "Complete onboarding before applying for membership",
            ));
        }
        if user.role.satisfies(UserRole::Member) {
            return Err(AppError::conflict("Already an approved member"));
        }
        if self
            .database
            .get_pending_application_for_user(user_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(error_messages::ALREADY_APPLIED));
        }

        let application = self.database.create_application(user_id, introduction).await?;
        info!(application_id = application.id, "membership application submitted");
        Ok(application)
    }

    /// Applications awaiting a decision, oldest first
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn pending_applications(&self) -> AppResult<Vec<JoinApplication>> {
        self.database
            .list_applications_by_status(ApplicationStatus::Pending)
            .await
    }

    /// Approve a pending application (ADMIN operation)
    ///
    /// The application flips to APPROVED, the applicant becomes a MEMBER
    /// with a seeded member profile, and an approval notification is
    /// enqueued, atomically.
    ///
    /// # Errors
    /// Returns an error if the application is missing, already decided, or
    /// persistence fails.
    #[tracing::instrument(skip(self))]
    pub async fn approve(
        &self,
        application_id: i64,
        admin_id: Uuid,
    ) -> AppResult<JoinApplication> {
        self.database
            .approve_application(
                application_id,
                admin_id,
                "Your membership application has been approved. Welcome aboard!",
            )
            .await
    }

    /// Reject a pending application (ADMIN operation)
    ///
    /// The applicant's role is unchanged; the application reaches the
    /// terminal REJECTED state (a new application is required to retry) and
    /// a rejection notification is enqueued.
    ///
    /// # Errors
    /// Returns an error if the application is missing, already decided, or
    /// persistence fails.
    #[tracing::instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        application_id: i64,
        admin_id: Uuid,
        reason: Option<&str>,
    ) -> AppResult<JoinApplication> {
        let message = reason.map_or_else(
            || "Your membership application was not approved.".to_owned(),
            |r| format!("Your membership application was not approved: {r}"),
        );
        self.database
            .reject_application(application_id, admin_id, &message)
            .await
    }

    async fn live_user(&self, user_id: Uuid) -> AppResult<User> {
        let user = self
            .database
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        if user.is_withdrawn() {
            return Err(AppError::forbidden(error_messages::ACCOUNT_WITHDRAWN));
        }
        Ok(user)
    }
}
