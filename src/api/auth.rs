//! Handlers under `{prefix}/auth`.

use axum::{Json, extract::State};
use serde_json::json;
use tracing::info;

use super::AppState;
use super::error::ApiError;
use super::json::ApiJson;
use crate::identity::UserMetadata;
use crate::model::{
    ApiMessage, LoginRequest, OAuthLoginRequest, SignupRequest, UserResponse, construct_full_name,
};
use crate::oauth;

/// POST {prefix}/auth/signup
pub(super) async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<Json<ApiMessage>, ApiError> {
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::BadRequest("a valid email is required".into()));
    }
    if req.password.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }

    let metadata = UserMetadata {
        full_name: Some(construct_full_name(&req.first_name, &req.last_name)),
        first_name: Some(req.first_name),
        last_name: Some(req.last_name),
        phone: req.phone,
        ..UserMetadata::default()
    };
    let user = state.identity.sign_up(req.email.trim(), &req.password, &metadata).await?;

    info!(user_id = %user.id, "user signed up");
    Ok(Json(ApiMessage::with_data("User created successfully", json!({ "user": user }))))
}

/// POST {prefix}/auth/login
pub(super) async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let session = state.identity.sign_in_with_password(req.email.trim(), &req.password).await?;

    let user = match session.user {
        Some(user) if !session.access_token.is_empty() => user,
        _ => return Err(ApiError::Unauthorized("Login failed".into())),
    };

    info!(user_id = %user.id, "user logged in");
    Ok(Json(UserResponse { access_token: session.access_token, user, profile: None }))
}

/// POST {prefix}/auth/oauth/login
///
/// `token` is the provider token; it is accepted as-is.
pub(super) async fn oauth_login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<OAuthLoginRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if req.token.is_empty() {
        tracing::debug!(provider = %req.provider, "oauth login without provider token");
    }
    oauth::login(&state.identity, &req.provider, req.user_info).await.map(Json)
}
