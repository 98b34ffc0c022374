//! Handlers under `{prefix}/user`. All require a bearer token.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::{info, warn};

use super::AppState;
use super::error::ApiError;
use super::json::ApiJson;
use crate::identity::AuthUser;
use crate::model::{ApiMessage, ProfileUpdate, UserProfile, merge_profile};

/// The user behind the request's `Authorization: Bearer <token>` header,
/// resolved through the identity backend.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: AuthUser,
    pub access_token: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let access_token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))?
            .to_string();
        let user = state.identity.get_user(&access_token).await?;
        Ok(Self { user, access_token })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// GET {prefix}/user/me
pub(super) async fn me(current: CurrentUser) -> Json<ApiMessage> {
    Json(ApiMessage::with_data(
        "User is authenticated",
        serde_json::json!({ "user": current.user }),
    ))
}

/// GET {prefix}/user/profile
pub(super) async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    let row = state.identity.fetch_profile(&current.user.id).await?;
    Ok(Json(merge_profile(&current.user, row.as_ref())))
}

/// PUT {prefix}/user/profile
///
/// Writes both the auth metadata and the `user_profiles` row.
pub(super) async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(mut update): ApiJson<ProfileUpdate>,
) -> Result<Json<ApiMessage>, ApiError> {
    let user_id = &current.user.id;

    if update.full_name.is_none() && (update.first_name.is_some() || update.last_name.is_some()) {
        let row = state.identity.fetch_profile(user_id).await.unwrap_or_else(|e| {
            warn!(%user_id, error = %e, "profile fetch failed, completing name from auth metadata");
            None
        });
        update.complete_full_name(&merge_profile(&current.user, row.as_ref()));
    }

    if !update.is_empty() {
        state.identity.update_user_metadata(user_id, &update.as_metadata()).await?;
        state.identity.update_profile(user_id, &update).await?;
        info!(%user_id, "profile updated");
    }
    Ok(Json(ApiMessage::new("Profile updated successfully")))
}
