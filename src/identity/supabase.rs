//! Supabase backend: GoTrue (`/auth/v1`) and PostgREST (`/rest/v1`) over HTTP.
//!
//! Every request carries `apikey: <service key>`. Admin and data calls also
//! authenticate as the service role; `get_user` authenticates as the caller.
//! Wire types stay private to this module.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{AuthUser, IdentityError, ProfileUpdate, ProfileRow, Session, UserMetadata};
use crate::config::SupabaseConfig;

const PROFILES_TABLE: &str = "user_profiles";
const ADMIN_PAGE_SIZE: u32 = 1000;

/// Cheap to clone; `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_key: String,
}

// GoTrue answers sign-up with either a session (autoconfirm) or a bare user.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession { user: AuthUser },
    User(AuthUser),
}

#[derive(Deserialize)]
struct AdminUserPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

impl SupabaseClient {
    pub fn new(config: &SupabaseConfig) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| IdentityError::Transport(format!("failed to build HTTP client: {e}")))?;

        if config.anon_key.is_empty() {
            debug!("SUPABASE_ANON_KEY not set; only the service key is used for requests");
        }

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Request authenticated as the service role.
    fn service(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.service_key).bearer_auth(&self.service_key)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, IdentityError> {
        let body = json!({ "email": email, "password": password, "data": metadata });
        let req = self.service(self.client.post(self.url("/auth/v1/signup"))).json(&body);
        let resp = check_status(send(req).await?).await?;
        match decode::<SignUpResponse>(resp).await? {
            SignUpResponse::WithSession { user } | SignUpResponse::User(user) => Ok(user),
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, IdentityError> {
        let body = json!({ "email": email, "password": password });
        let req = self
            .service(self.client.post(self.url("/auth/v1/token?grant_type=password")))
            .json(&body);
        let resp = check_status(send(req).await?).await?;
        decode(resp).await
    }

    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, IdentityError> {
        let req = self
            .client
            .get(self.url("/auth/v1/user"))
            .header("apikey", &self.service_key)
            .bearer_auth(access_token);
        let resp = send(req).await?;
        if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(IdentityError::Unauthorized);
        }
        decode(check_status(resp).await?).await
    }

    /// Scans the first admin page of users. Larger projects need a server-side filter.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, IdentityError> {
        let path = format!("/auth/v1/admin/users?page=1&per_page={ADMIN_PAGE_SIZE}");
        let req = self.service(self.client.get(self.url(&path)));
        let page: AdminUserPage = decode(check_status(send(req).await?).await?).await?;
        if page.users.len() as u32 >= ADMIN_PAGE_SIZE {
            warn!(page_size = ADMIN_PAGE_SIZE, "admin user listing is full; lookup may miss users");
        }
        Ok(page
            .users
            .into_iter()
            .find(|u| u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))))
    }

    pub async fn update_user_metadata(
        &self,
        user_id: &str,
        metadata: &UserMetadata,
    ) -> Result<(), IdentityError> {
        let path = format!("/auth/v1/admin/users/{user_id}");
        let req = self
            .service(self.client.put(self.url(&path)))
            .json(&json!({ "user_metadata": metadata }));
        check_status(send(req).await?).await?;
        Ok(())
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, IdentityError> {
        let path = format!("/rest/v1/{PROFILES_TABLE}?id=eq.{user_id}&select=*");
        let req = self.service(self.client.get(self.url(&path)));
        let rows: Vec<ProfileRow> = decode(check_status(send(req).await?).await?).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        changes: &ProfileUpdate,
    ) -> Result<(), IdentityError> {
        let path = format!("/rest/v1/{PROFILES_TABLE}?id=eq.{user_id}");
        let req = self
            .service(self.client.patch(self.url(&path)))
            .header("Prefer", "return=minimal")
            .json(changes);
        check_status(send(req).await?).await?;
        Ok(())
    }
}

async fn send(req: RequestBuilder) -> Result<Response, IdentityError> {
    req.send()
        .await
        .map_err(|e| IdentityError::Transport(e.to_string()))
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, IdentityError> {
    resp.json::<T>()
        .await
        .map_err(|e| IdentityError::Decode(e.to_string()))
}

/// Pass through a success response, otherwise turn the body into `Rejected`.
async fn check_status(resp: Response) -> Result<Response, IdentityError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = error_message(&body).unwrap_or_else(|| format!("HTTP {status}"));

    warn!(%status, %message, "identity service returned an error");
    Err(IdentityError::Rejected { status: status.as_u16(), message })
}

/// GoTrue and PostgREST use different error envelopes.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}
