//! OAuth login reconciliation.
//!
//! The frontend completes the provider flow and posts the provider's user
//! info. We map it to a typed record, find the auth user with that email or
//! create one, and answer with a [`UserResponse`].

use rand_core::{OsRng, RngCore};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::error::ApiError;
use crate::identity::{AuthUser, IdentityBackend, UserMetadata};
use crate::model::{UserProfile, UserResponse, construct_full_name, merge_profile};

const PASSWORD_LEN: usize = 16;
const PASSWORD_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const PLACEHOLDER_TOKEN_PREFIX: &str = "oauth_temp_token_";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoogleUserInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubUserInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenericUserInfo {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Provider user info, typed per provider.
#[derive(Debug, Clone)]
pub enum OAuthIdentity {
    Google(GoogleUserInfo),
    Github(GithubUserInfo),
    Other { provider: String, info: GenericUserInfo },
}

/// Provider-independent view of an [`OAuthIdentity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

pub enum Reconciled {
    Existing(AuthUser),
    Created(AuthUser),
}

impl Reconciled {
    pub fn user(&self) -> &AuthUser {
        match self {
            Self::Existing(u) | Self::Created(u) => u,
        }
    }
}

impl OAuthIdentity {
    pub fn from_wire(provider: &str, user_info: serde_json::Value) -> Result<Self, ApiError> {
        let provider = provider.trim().to_ascii_lowercase();
        let user_info = if user_info.is_null() { serde_json::json!({}) } else { user_info };
        let bad = |e: serde_json::Error| ApiError::BadRequest(format!("invalid OAuth user info: {e}"));

        Ok(match provider.as_str() {
            "google" => Self::Google(serde_json::from_value(user_info).map_err(bad)?),
            "github" => Self::Github(serde_json::from_value(user_info).map_err(bad)?),
            other => Self::Other {
                provider: other.to_string(),
                info: serde_json::from_value(user_info).map_err(bad)?,
            },
        })
    }

    pub fn provider(&self) -> &str {
        match self {
            Self::Google(_) => "google",
            Self::Github(_) => "github",
            Self::Other { provider, .. } => provider,
        }
    }

    pub fn normalize(&self) -> NormalizedIdentity {
        let text = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();

        match self {
            Self::Google(info) => {
                let first_name = text(&info.given_name);
                let last_name = text(&info.family_name);
                let full_name = match text(&info.name) {
                    n if n.is_empty() => construct_full_name(&first_name, &last_name),
                    n => n,
                };
                NormalizedIdentity { email: text(&info.email), first_name, last_name, full_name }
            }
            Self::Github(info) => {
                let full_name = text(&info.name);
                let (first_name, last_name) = match full_name.split_once(' ') {
                    Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
                    None => (full_name.clone(), String::new()),
                };
                NormalizedIdentity { email: text(&info.email), first_name, last_name, full_name }
            }
            Self::Other { info, .. } => NormalizedIdentity {
                email: text(&info.email),
                first_name: String::new(),
                last_name: String::new(),
                full_name: text(&info.name),
            },
        }
    }
}

/// Find the auth user for `identity` by email, or create one.
pub async fn reconcile(
    backend: &IdentityBackend,
    identity: &OAuthIdentity,
) -> Result<Reconciled, ApiError> {
    let norm = identity.normalize();
    if norm.email.is_empty() {
        return Err(ApiError::BadRequest("Email not found in OAuth user info".into()));
    }

    match backend.find_user_by_email(&norm.email).await {
        Ok(Some(user)) => return Ok(Reconciled::Existing(user)),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "user lookup failed, treating as new user"),
    }

    let metadata = UserMetadata {
        first_name: Some(norm.first_name),
        last_name: Some(norm.last_name),
        full_name: Some(norm.full_name),
        oauth_provider: Some(identity.provider().to_string()),
        oauth_verified: Some(true),
        ..UserMetadata::default()
    };
    let password = generate_random_password(PASSWORD_LEN)?;
    let user = backend
        .sign_up(&norm.email, &password, &metadata)
        .await
        .map_err(|e| ApiError::OAuth(e.to_string()))?;
    Ok(Reconciled::Created(user))
}

/// Full OAuth login: reconcile, then build the response.
pub async fn login(
    backend: &IdentityBackend,
    provider: &str,
    user_info: serde_json::Value,
) -> Result<UserResponse, ApiError> {
    let identity = OAuthIdentity::from_wire(provider, user_info)?;
    let reconciled = reconcile(backend, &identity).await?;

    let profile = match &reconciled {
        Reconciled::Existing(user) => {
            let row = backend.fetch_profile(&user.id).await.unwrap_or_else(|e| {
                warn!(user_id = %user.id, error = %e, "profile fetch failed, using auth metadata");
                None
            });
            merge_profile(user, row.as_ref())
        }
        Reconciled::Created(user) => {
            let norm = identity.normalize();
            UserProfile {
                id: user.id.clone(),
                email: norm.email,
                first_name: norm.first_name,
                last_name: norm.last_name,
                full_name: norm.full_name,
                phone: String::new(),
                role: "user".into(),
                created_at: user.created_at.clone(),
            }
        }
    };

    let user = reconciled.user().clone();
    info!(
        user_id = %user.id,
        provider = identity.provider(),
        created = matches!(reconciled, Reconciled::Created(_)),
        "oauth login"
    );
    Ok(UserResponse {
        access_token: placeholder_access_token(&user.id),
        user,
        profile: Some(profile),
    })
}

/// Token returned to the frontend after OAuth login. It is not a session
/// token; bearer-protected routes reject it.
pub fn placeholder_access_token(user_id: &str) -> String {
    format!("{PLACEHOLDER_TOKEN_PREFIX}{user_id}")
}

/// `len` characters from `[A-Za-z0-9]`, drawn from the OS RNG without modulo bias.
pub fn generate_random_password(len: usize) -> Result<String, ApiError> {
    // Largest multiple of the alphabet size that fits in a byte.
    let limit = 256 - (256 % PASSWORD_ALPHABET.len());
    let mut out = String::with_capacity(len);
    let mut buf = [0u8; 32];

    while out.len() < len {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| ApiError::Internal(format!("entropy source unavailable: {e}")))?;
        for &b in buf.iter().filter(|&&b| (b as usize) < limit) {
            if out.len() == len {
                break;
            }
            out.push(PASSWORD_ALPHABET[b as usize % PASSWORD_ALPHABET.len()] as char);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::MemoryBackend;
    use serde_json::json;

    #[test]
    fn google_uses_given_and_family_names() {
        let id = OAuthIdentity::from_wire(
            "google",
            json!({ "email": "a@b.c", "given_name": "Ada", "family_name": "Lovelace" }),
        )
        .unwrap();
        let n = id.normalize();
        assert_eq!(n.first_name, "Ada");
        assert_eq!(n.last_name, "Lovelace");
        assert_eq!(n.full_name, "Ada Lovelace");
    }

    #[test]
    fn github_splits_name_on_first_space() {
        let id = OAuthIdentity::from_wire(
            "GitHub",
            json!({ "email": "a@b.c", "name": "Grace Brewster Hopper", "login": "grace" }),
        )
        .unwrap();
        assert_eq!(id.provider(), "github");
        let n = id.normalize();
        assert_eq!(n.first_name, "Grace");
        assert_eq!(n.last_name, "Brewster Hopper");
        assert_eq!(n.full_name, "Grace Brewster Hopper");
    }

    #[test]
    fn other_provider_keeps_only_full_name() {
        let id = OAuthIdentity::from_wire("gitlab", json!({ "email": "a@b.c", "name": "Linus T" })).unwrap();
        assert_eq!(id.provider(), "gitlab");
        let n = id.normalize();
        assert_eq!(n.first_name, "");
        assert_eq!(n.full_name, "Linus T");
    }

    #[test]
    fn malformed_user_info_is_bad_request() {
        let err = OAuthIdentity::from_wire("google", json!({ "email": 42 })).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn password_is_alphanumeric() {
        let pw = generate_random_password(16).unwrap();
        assert_eq!(pw.len(), 16);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(pw, generate_random_password(16).unwrap());
    }

    #[tokio::test]
    async fn missing_email_is_rejected() {
        let backend = IdentityBackend::Memory(MemoryBackend::default());
        let id = OAuthIdentity::from_wire("github", json!({ "name": "No Mail" })).unwrap();
        let err = reconcile(&backend, &id).await.err().unwrap();
        assert_eq!(err.to_string(), "Email not found in OAuth user info");
    }

    #[tokio::test]
    async fn second_login_finds_existing_user() {
        let backend = IdentityBackend::Memory(MemoryBackend::default());
        let info = json!({ "email": "ada@example.com", "given_name": "Ada", "family_name": "L" });

        let first = login(&backend, "google", info.clone()).await.unwrap();
        let profile = first.profile.as_ref().unwrap();
        assert_eq!(profile.full_name, "Ada L");
        assert_eq!(first.access_token, format!("oauth_temp_token_{}", first.user.id));
        assert_eq!(first.user.user_metadata.oauth_provider.as_deref(), Some("google"));
        assert_eq!(first.user.user_metadata.oauth_verified, Some(true));

        let second = login(&backend, "google", info).await.unwrap();
        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.profile.unwrap().first_name, "Ada");
    }
}
