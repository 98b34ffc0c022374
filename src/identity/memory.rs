//! In-process identity store.
//!
//! Behaves like the Supabase backend as far as handlers can tell: duplicate
//! sign-ups are rejected, wrong passwords are rejected, unknown tokens are
//! `Unauthorized`. Nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use super::{AuthUser, IdentityError, ProfileUpdate, ProfileRow, Session, UserMetadata};

#[derive(Debug, Default)]
struct Store {
    /// user id → (user, password)
    users: HashMap<String, (AuthUser, String)>,
    /// access token → user id
    tokens: HashMap<String, String>,
    /// user id → `user_profiles` row
    profiles: HashMap<String, ProfileRow>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<RwLock<Store>>,
}

impl MemoryBackend {
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, IdentityError> {
        let mut store = self.store.write().await;
        let taken = store
            .users
            .values()
            .any(|(u, _)| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)));
        if taken {
            return Err(rejected(422, "User already registered"));
        }

        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: Some(email.to_ascii_lowercase()),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            user_metadata: metadata.clone(),
        };
        store.users.insert(user.id.clone(), (user.clone(), password.to_string()));
        debug!(user_id = %user.id, "memory user created");
        Ok(user)
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let mut store = self.store.write().await;
        let user = store
            .users
            .values()
            .find(|(u, pw)| {
                pw == password && u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|(u, _)| u.clone())
            .ok_or_else(|| rejected(400, "Invalid login credentials"))?;

        let access_token = format!("mem_{}", uuid::Uuid::new_v4().simple());
        store.tokens.insert(access_token.clone(), user.id.clone());
        Ok(Session { access_token, user: Some(user) })
    }

    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, IdentityError> {
        let store = self.store.read().await;
        store
            .tokens
            .get(access_token)
            .and_then(|id| store.users.get(id))
            .map(|(u, _)| u.clone())
            .ok_or(IdentityError::Unauthorized)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, IdentityError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .values()
            .map(|(u, _)| u)
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
            .cloned())
    }

    pub async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), IdentityError> {
        let mut store = self.store.write().await;
        let (user, _) = store
            .users
            .get_mut(user_id)
            .ok_or_else(|| rejected(404, "User not found"))?;
        user.user_metadata.merge(metadata);
        Ok(())
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, IdentityError> {
        Ok(self.store.read().await.profiles.get(user_id).cloned())
    }

    /// Like a PostgREST PATCH: zero matching rows is a no-op.
    pub async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<(), IdentityError> {
        if let Some(row) = self.store.write().await.profiles.get_mut(user_id) {
            changes.apply_to(row);
        }
        Ok(())
    }

    /// Insert or replace a `user_profiles` row.
    pub async fn put_profile(&self, user_id: &str, mut row: ProfileRow) {
        row.id = Some(user_id.to_string());
        self.store.write().await.profiles.insert(user_id.to_string(), row);
    }
}

fn rejected(status: u16, message: &str) -> IdentityError {
    IdentityError::Rejected { status, message: message.to_string() }
}
