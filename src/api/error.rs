//! Handler error kinds and their HTTP mapping.
//!
//! | kind           | status | notes                          |
//! |----------------|--------|--------------------------------|
//! | `BadRequest`   | 400    | validation, rejected requests  |
//! | `Unauthorized` | 401    | sets `WWW-Authenticate: Bearer`|
//! | `Body`         | 400/415/422 | unreadable JSON request body |
//! | `OAuth`        | 500    | detail prefixed `OAuth login failed: ` |
//! | `Internal`     | 500    |                                |
//!
//! Every body is `{"detail": "<message>"}`.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::identity::IdentityError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    /// Request body missing, not JSON, or not the expected shape.
    #[error("{detail}")]
    Body { status: StatusCode, detail: String },
    #[error("OAuth login failed: {0}")]
    OAuth(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Body { status, .. } => *status,
            Self::OAuth(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Default mapping for handlers: a bad token is 401, anything else the
/// identity service refuses or fails on is reported as a bad request.
impl From<IdentityError> for ApiError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Unauthorized => Self::Unauthorized("Could not validate credentials".into()),
            other => Self::BadRequest(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Body { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(%status, %detail, "request failed");
        } else {
            warn!(%status, %detail, "request rejected");
        }

        let body = Json(json!({ "detail": detail }));
        match self {
            Self::Unauthorized(_) => {
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            _ => (status, body).into_response(),
        }
    }
}
