//! Identity backend abstraction.
//!
//! `IdentityBackend` is an enum over concrete backends: Supabase over HTTP,
//! and an in-process store used by tests and `IDENTITY_BACKEND=memory` runs.
//! Handlers hold a clone; every variant is cheap to clone.

pub mod memory;
pub mod supabase;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::{BackendKind, Config};

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The identity service answered with a non-success status.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("invalid or expired access token")]
    Unauthorized,
    #[error("identity service unreachable: {0}")]
    Transport(String),
    #[error("unexpected identity service response: {0}")]
    Decode(String),
}

// ── Records ───────────────────────────────────────────────────────────────────

/// `user_metadata` attached to an auth user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_verified: Option<bool>,
}

impl UserMetadata {
    /// Overwrite the fields that are set in `other`.
    pub fn merge(&mut self, other: &UserMetadata) {
        fn take<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        take(&mut self.first_name, &other.first_name);
        take(&mut self.last_name, &other.last_name);
        take(&mut self.full_name, &other.full_name);
        take(&mut self.phone, &other.phone);
        take(&mut self.oauth_provider, &other.oauth_provider);
        take(&mut self.oauth_verified, &other.oauth_verified);
    }
}

/// A user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_metadata: UserMetadata,
}

/// Result of a password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

/// A row of the `user_profiles` table. Columns may be null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Profile fields a user may change. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
    }

    /// The same changes expressed as auth metadata.
    pub fn as_metadata(&self) -> UserMetadata {
        UserMetadata {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            ..UserMetadata::default()
        }
    }

    pub fn apply_to(&self, row: &mut ProfileRow) {
        let pairs = [
            (&mut row.first_name, &self.first_name),
            (&mut row.last_name, &self.last_name),
            (&mut row.full_name, &self.full_name),
            (&mut row.phone, &self.phone),
        ];
        for (dst, src) in pairs {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Backend enum ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum IdentityBackend {
    Supabase(supabase::SupabaseClient),
    Memory(memory::MemoryBackend),
}

impl IdentityBackend {
    /// Construct the backend selected by `config.backend`.
    pub fn build(config: &Config) -> Result<Self, IdentityError> {
        match config.backend {
            BackendKind::Supabase => {
                Ok(Self::Supabase(supabase::SupabaseClient::new(&config.supabase)?))
            }
            BackendKind::Memory => Ok(Self::Memory(memory::MemoryBackend::default())),
        }
    }

    /// Register `email` with `password`; `metadata` lands in `user_metadata`.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, IdentityError> {
        match self {
            Self::Supabase(c) => c.sign_up(email, password, metadata).await,
            Self::Memory(m) => m.sign_up(email, password, metadata).await,
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        match self {
            Self::Supabase(c) => c.sign_in_with_password(email, password).await,
            Self::Memory(m) => m.sign_in_with_password(email, password).await,
        }
    }

    /// Resolve an access token to its user. Invalid tokens → `Unauthorized`.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, IdentityError> {
        match self {
            Self::Supabase(c) => c.get_user(access_token).await,
            Self::Memory(m) => m.get_user(access_token).await,
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, IdentityError> {
        match self {
            Self::Supabase(c) => c.find_user_by_email(email).await,
            Self::Memory(m) => m.find_user_by_email(email).await,
        }
    }

    /// Merge `metadata` into the user's `user_metadata`.
    pub async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), IdentityError> {
        match self {
            Self::Supabase(c) => c.update_user_metadata(user_id, metadata).await,
            Self::Memory(m) => m.update_user_metadata(user_id, metadata).await,
        }
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, IdentityError> {
        match self {
            Self::Supabase(c) => c.fetch_profile(user_id).await,
            Self::Memory(m) => m.fetch_profile(user_id).await,
        }
    }

    /// Update the `user_profiles` row of `user_id`. A missing row is not an error.
    pub async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<(), IdentityError> {
        match self {
            Self::Supabase(c) => c.update_profile(user_id, changes).await,
            Self::Memory(m) => m.update_profile(user_id, changes).await,
        }
    }
}
