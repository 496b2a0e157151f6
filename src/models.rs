// ABOUTME: Core data models for accounts, membership applications, and notifications
// ABOUTME: Defines the role ladder and the canonical identity produced by federated login
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Data models
//!
//! The central invariant lives here: a [`User`] is keyed by the pair
//! (`provider`, `provider_subject_id`), which is unique and immutable after
//! creation, and [`UserRole`] only ever advances through the ladder
//! GUEST → USER → MEMBER → ADMIN (no downward transitions).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trust tiers, ordered lowest to highest
///
/// Derived `Ord` follows declaration order, so `role >= UserRole::Member`
/// reads as "member or better".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Fresh federated login, no additional info collected
    Guest,
    /// Completed onboarding (contact info, terms)
    User,
    /// Organization-approved member
    Member,
    /// Operator-granted administrator (out of band)
    Admin,
}

impl UserRole {
    /// Role name as stored in the database and token claims
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::User => "USER",
            Self::Member => "MEMBER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parse a role name; `None` for anything unrecognized
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "GUEST" => Some(Self::Guest),
            "USER" => Some(Self::User),
            "MEMBER" => Some(Self::Member),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Parse a role name, falling back to the lowest tier
    ///
    /// Unknown role strings in stored data degrade to GUEST rather than
    /// failing the read.
    #[must_use]
    pub fn parse_lossy(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(role = value, "unknown role string, treating as GUEST");
            Self::Guest
        })
    }

    /// Whether this role grants at least `required`
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-agnostic identity produced per login attempt
///
/// Ephemeral: consumed once by the identity resolver, never persisted
/// directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIdentity {
    /// Provider name ("kakao", "naver", "google")
    pub provider: String,
    /// Provider-assigned subject id, unique within the provider
    pub provider_subject_id: String,
    /// Email, absent when the user denied the scope
    pub email: Option<String>,
    /// Display name, absent when the user denied the scope
    pub display_name: Option<String>,
    /// Avatar image URL, absent when the user denied the scope
    pub avatar_url: Option<String>,
}

/// Persistent local account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Account id
    pub id: Uuid,
    /// Federated provider this account came from
    pub provider: String,
    /// Provider subject id; (provider, `provider_subject_id`) is unique
    pub provider_subject_id: String,
    /// Email, unique among live accounts when present
    pub email: Option<String>,
    /// Display name, refreshed from the provider on every login
    pub display_name: String,
    /// Avatar URL, refreshed from the provider on every login
    pub avatar_url: Option<String>,
    /// Current trust tier
    pub role: UserRole,
    /// Contact phone collected during onboarding
    pub phone: Option<String>,
    /// Birth date collected during onboarding
    pub birth_date: Option<NaiveDate>,
    /// Gender collected during onboarding
    pub gender: Option<String>,
    /// When the user accepted the terms of service
    pub terms_accepted_at: Option<DateTime<Utc>>,
    /// Account creation time (first login)
    pub created_at: DateTime<Utc>,
    /// Most recent login time
    pub last_login_at: DateTime<Utc>,
    /// Soft-deletion marker; withdrawn accounts are never hard-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Whether the account has been withdrawn
    #[must_use]
    pub fn is_withdrawn(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Lifecycle of a membership application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Submitted, awaiting an administrator's decision
    Pending,
    /// Approved; the applicant was promoted to MEMBER
    Approved,
    /// Rejected; terminal, a new application is required to retry
    Rejected,
}

impl ApplicationStatus {
    /// Status name as stored in the database
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse a stored status name
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// A user's application to become an approved member
#[derive(Debug, Clone, Serialize)]
pub struct JoinApplication {
    /// Application id
    pub id: i64,
    /// Applicant
    pub user_id: Uuid,
    /// Self-introduction written by the applicant
    pub introduction: String,
    /// Current lifecycle state
    pub status: ApplicationStatus,
    /// Administrator who decided the application
    pub decided_by: Option<Uuid>,
    /// When the decision was made
    pub decided_at: Option<DateTime<Utc>>,
    /// Submission time
    pub created_at: DateTime<Utc>,
}

/// Member profile created when an application is approved
#[derive(Debug, Clone, Serialize)]
pub struct MemberProfile {
    /// Owning user
    pub user_id: Uuid,
    /// Introduction seeded from the approved application
    pub introduction: String,
    /// When membership was granted
    pub joined_at: DateTime<Utc>,
}

/// Queued notification for a user
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// Notification id
    pub id: i64,
    /// Recipient
    pub user_id: Uuid,
    /// Machine-readable kind ("membership.approved", ...)
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Enqueue time
    pub created_at: DateTime<Utc>,
}
