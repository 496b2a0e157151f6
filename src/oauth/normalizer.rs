// ABOUTME: Maps raw provider user-info payloads into canonical identities
// ABOUTME: Registry of per-provider strategies with an explicit, logged default
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubroom Contributors

//! Identity normalization
//!
//! Each provider nests its user-info payload differently:
//!
//! - **Kakao**: subject id at the top-level `id` key; profile fields one
//!   level down under `kakao_account`, individually gated by
//!   `*_needs_agreement` keys when the user denied a scope
//! - **Naver**: the whole profile sits one level under the subject-id key
//!   name itself (`response`), so extraction re-fetches the nested map
//! - **Google**: flat payload (`sub` / `email` / `name` / `picture`)
//!
//! A denied or absent optional field becomes `None`; login never fails
//! because a user withheld a profile scope. Only a missing subject id is an
//! error. Unrecognized provider names fall back to an explicit default
//! strategy (Kakao-shaped) and log a warning so a mistyped provider name is
//! visible instead of silently mis-parsed.

use serde_json::Value;
use tracing::warn;

use crate::errors::{AppError, AppResult};
use crate::models::CanonicalIdentity;

/// One provider's extraction strategy
pub trait ProviderNormalizer: Send + Sync {
    /// Provider name this strategy handles
    fn provider(&self) -> &'static str;

    /// Map a raw attribute tree into a canonical identity
    ///
    /// `subject_id_key` is the provider-specific key carrying the subject id
    /// (or, for Naver-style payloads, the nesting key).
    ///
    /// # Errors
    /// Returns an error only when the subject id cannot be extracted.
    fn normalize(
        &self,
        provider: &str,
        subject_id_key: &str,
        attributes: &Value,
    ) -> AppResult<CanonicalIdentity>;
}

/// Kakao-shaped extraction: top-level subject id, profile nested under
/// `kakao_account`, scope-gated fields
pub struct KakaoNormalizer;

impl ProviderNormalizer for KakaoNormalizer {
    fn provider(&self) -> &'static str {
        "kakao"
    }

    fn normalize(
        &self,
        provider: &str,
        subject_id_key: &str,
        attributes: &Value,
    ) -> AppResult<CanonicalIdentity> {
        let subject_id = value_to_subject_id(attributes.get(subject_id_key))
            .ok_or_else(|| missing_subject(provider, subject_id_key))?;

        let account = attributes.get("kakao_account");
        let profile = account.and_then(|a| a.get("profile"));

        let email = scope_granted(account, "email_needs_agreement")
            .then(|| string_field(account, "email"))
            .flatten();
        let display_name = scope_granted(account, "profile_nickname_needs_agreement")
            .then(|| string_field(profile, "nickname"))
            .flatten();
        let avatar_url = scope_granted(account, "profile_image_needs_agreement")
            .then(|| string_field(profile, "profile_image_url"))
            .flatten();

        Ok(CanonicalIdentity {
            provider: provider.to_owned(),
            provider_subject_id: subject_id,
            email,
            display_name,
            avatar_url,
        })
    }
}

/// Naver-shaped extraction: the profile map is nested one level under the
/// subject-id key name itself
pub struct NaverNormalizer;

impl ProviderNormalizer for NaverNormalizer {
    fn provider(&self) -> &'static str {
        "naver"
    }

    fn normalize(
        &self,
        provider: &str,
        subject_id_key: &str,
        attributes: &Value,
    ) -> AppResult<CanonicalIdentity> {
        // The payload nests everything under the subject-id key; re-fetch
        // the nested map before reading any field
        let nested = attributes
            .get(subject_id_key)
            .and_then(Value::as_object)
            .ok_or_else(|| missing_subject(provider, subject_id_key))?;

        let subject_id = value_to_subject_id(nested.get("id"))
            .ok_or_else(|| missing_subject(provider, "id"))?;

        Ok(CanonicalIdentity {
            provider: provider.to_owned(),
            provider_subject_id: subject_id,
            email: nested.get("email").and_then(Value::as_str).map(str::to_owned),
            display_name: nested.get("name").and_then(Value::as_str).map(str::to_owned),
            avatar_url: nested
                .get("profile_image")
                .and_then(Value::as_str)
                .map(str::to_owned),
        })
    }
}

/// Google-shaped extraction: flat OpenID Connect payload
pub struct GoogleNormalizer;

impl ProviderNormalizer for GoogleNormalizer {
    fn provider(&self) -> &'static str {
        "google"
    }

    fn normalize(
        &self,
        provider: &str,
        subject_id_key: &str,
        attributes: &Value,
    ) -> AppResult<CanonicalIdentity> {
        let subject_id = value_to_subject_id(attributes.get(subject_id_key))
            .ok_or_else(|| missing_subject(provider, subject_id_key))?;

        Ok(CanonicalIdentity {
            provider: provider.to_owned(),
            provider_subject_id: subject_id,
            email: string_field(Some(attributes), "email"),
            display_name: string_field(Some(attributes), "name"),
            avatar_url: string_field(Some(attributes), "picture"),
        })
    }
}

/// Registry mapping provider names to strategies, with an explicit default
pub struct NormalizerRegistry {
    strategies: Vec<Box<dyn ProviderNormalizer>>,
    default: Box<dyn ProviderNormalizer>,
}

impl NormalizerRegistry {
    /// Registry covering kakao, naver, and google, defaulting to the
    /// Kakao-shaped strategy for anything else
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(KakaoNormalizer),
                Box::new(NaverNormalizer),
                Box::new(GoogleNormalizer),
            ],
            default: Box::new(KakaoNormalizer),
        }
    }

    /// Normalize a payload for `provider`
    ///
    /// Unrecognized provider names use the default strategy; the fallback is
    /// logged so configuration typos surface instead of parsing with the
    /// wrong shape silently.
    ///
    /// # Errors
    /// Returns an error when the subject id cannot be extracted.
    pub fn normalize(
        &self,
        provider: &str,
        subject_id_key: &str,
        attributes: &Value,
    ) -> AppResult<CanonicalIdentity> {
        let strategy: &dyn ProviderNormalizer =
            match self.strategies.iter().find(|s| s.provider() == provider) {
                Some(strategy) => strategy.as_ref(),
                None => {
                    warn!(
                        provider,
                        default = self.default.provider(),
                        "no normalization strategy registered for provider, using default"
                    );
                    self.default.as_ref()
                }
            };

        strategy.normalize(provider, subject_id_key, attributes)
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Subject ids arrive as JSON numbers (Kakao) or strings (Naver, Google)
fn value_to_subject_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_field(container: Option<&Value>, key: &str) -> Option<String> {
    container?
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// A `*_needs_agreement: true` key means the user denied that scope; an
/// absent gate means granted
fn scope_granted(container: Option<&Value>, gate_key: &str) -> bool {
    !container
        .and_then(|c| c.get(gate_key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn missing_subject(provider: &str, key: &str) -> AppError {
    AppError::auth_invalid(format!(
        "Provider payload from {provider} is missing subject id key '{key}'"
    ))
}
