//! Request and response bodies of the HTTP API, and the profile merge rules.

use serde::{Deserialize, Serialize};

use crate::identity::{AuthUser, ProfileRow};

pub use crate::identity::ProfileUpdate;

const DEFAULT_ROLE: &str = "user";

// ── Requests ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthLoginRequest {
    pub provider: String,
    /// Provider access token. Accepted but not verified against the provider.
    pub token: String,
    #[serde(default)]
    pub user_info: serde_json::Value,
}

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiMessage {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), data: None }
    }

    pub fn with_data(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self { message: message.into(), data: Some(data) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub access_token: String,
    pub user: AuthUser,
    pub profile: Option<UserProfile>,
}

// ── Merge rules ───────────────────────────────────────────────────────────────

/// Build the profile view of `user`.
///
/// Per field, a non-null `user_profiles` column wins over auth metadata,
/// which wins over the empty string.
pub fn merge_profile(user: &AuthUser, row: Option<&ProfileRow>) -> UserProfile {
    let meta = &user.user_metadata;
    let pick = |column: Option<&Option<String>>, fallback: &Option<String>| {
        column
            .and_then(|c| c.clone())
            .or_else(|| fallback.clone())
            .unwrap_or_default()
    };

    UserProfile {
        id: user.id.clone(),
        email: user.email.clone().unwrap_or_default(),
        first_name: pick(row.map(|r| &r.first_name), &meta.first_name),
        last_name: pick(row.map(|r| &r.last_name), &meta.last_name),
        full_name: pick(row.map(|r| &r.full_name), &meta.full_name),
        phone: pick(row.map(|r| &r.phone), &meta.phone),
        role: row
            .and_then(|r| r.role.clone())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string()),
        created_at: row
            .and_then(|r| r.created_at.clone())
            .or_else(|| user.created_at.clone()),
    }
}

/// `"<first> <last>"` with missing parts dropped.
pub fn construct_full_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

impl ProfileUpdate {
    /// Fill `full_name` when only first and/or last name change.
    ///
    /// The unchanged half comes from `current`, the profile as it is now.
    pub fn complete_full_name(&mut self, current: &UserProfile) {
        if self.full_name.is_some() || (self.first_name.is_none() && self.last_name.is_none()) {
            return;
        }
        let first = self.first_name.as_deref().unwrap_or(&current.first_name);
        let last = self.last_name.as_deref().unwrap_or(&current.last_name);
        self.full_name = Some(construct_full_name(first, last));
    }
}
