use axum::Json;
use serde_json::{Value, json};

/// Service banner
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "API is online")),
    tag = "health"
)]
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Gemelo Digital API",
        "status": "online",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy")),
    tag = "health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
