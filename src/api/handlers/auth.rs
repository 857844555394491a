use crate::{
    AppState,
    auth::middleware::AuthUser,
    types::{LoginRequest, Result, TokenResponse},
};
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Login with the admin credentials
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .auth_service
        .login(&payload.username, &payload.password)?;

    tracing::info!(username = %payload.username, "Admin logged in");
    Ok(Json(token))
}

/// Check that the auth router is reachable
#[utoipa::path(
    get,
    path = "/api/auth/test",
    responses((status = 200, description = "Router is up")),
    tag = "auth"
)]
pub async fn auth_test() -> Json<Value> {
    Json(json!({
        "message": "Auth router is working!",
        "status": "ok"
    }))
}

/// Check that the presented token is valid
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer" = []))
)]
pub async fn verify(AuthUser(claims): AuthUser) -> Json<Value> {
    Json(json!({
        "user": claims.sub,
        "authenticated": true
    }))
}
