use axum::Json;
use serde_json::{Value, json};

use crate::model::HealthCheck;

/// GET /
pub(super) async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World" }))
}

/// GET /health
pub(super) async fn health() -> Json<HealthCheck> {
    Json(HealthCheck { status: "healthy", message: "API is running normally" })
}
