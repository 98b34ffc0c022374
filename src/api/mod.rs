//! HTTP surface.
//!
//! ```text
//! GET  /                          → {"Hello": "World"}
//! GET  /health
//! POST {prefix}/auth/signup
//! POST {prefix}/auth/login
//! POST {prefix}/auth/oauth/login
//! GET  {prefix}/user/me           (bearer)
//! GET  {prefix}/user/profile      (bearer)
//! PUT  {prefix}/user/profile      (bearer)
//! ```
//!
//! `serve` binds, then runs until the [`CancellationToken`] is cancelled.

mod auth;
mod base;
pub mod error;
mod json;
mod user;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::identity::IdentityBackend;

pub use user::CurrentUser;

/// Router state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: IdentityBackend,
}

pub fn build_router(state: AppState) -> Router {
    let prefix = state.config.api_prefix.clone();
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/",                                          get(base::root))
        .route("/health",                                    get(base::health))
        .route(&format!("{prefix}/auth/signup"),             post(auth::signup))
        .route(&format!("{prefix}/auth/login"),              post(auth::login))
        .route(&format!("{prefix}/auth/oauth/login"),        post(auth::oauth_login))
        .route(&format!("{prefix}/user/me"),                 get(user::me))
        .route(&format!("{prefix}/user/profile"),            get(user::get_profile).put(user::update_profile))
        .layer(cors)
        .with_state(state)
}

/// Credentials allowed; methods and headers mirrored from the preflight.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub async fn serve(
    config: Arc<Config>,
    identity: IdentityBackend,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let bind_addr = config.bind_addr();
    let router = build_router(AppState { config: config.clone(), identity });

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(project = %config.project_name, %bind_addr, prefix = %config.api_prefix, "api listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("api shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::memory::MemoryBackend;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    fn router() -> Router {
        build_router(AppState {
            config: Arc::new(Config::test_default()),
            identity: IdentityBackend::Memory(MemoryBackend::default()),
        })
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin() {
        let resp = router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/user/profile")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(), "true");
    }

    #[tokio::test]
    async fn other_origins_get_no_cors_headers() {
        let resp = router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn routes_outside_prefix_are_404() {
        let resp = router()
            .oneshot(Request::builder().uri("/api/user/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
