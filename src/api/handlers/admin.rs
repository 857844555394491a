use crate::{AppState, types::Result};
use axum::{Json, extract::State};
use serde_json::{Value, json};

/// Drop and recreate the document collection
///
/// Every stored chunk is lost.
#[utoipa::path(
    post,
    path = "/api/admin/reset_collection",
    responses(
        (status = 200, description = "Collection reset"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Vector store error")
    ),
    tag = "admin",
    security(("bearer" = []))
)]
pub async fn reset_collection(State(state): State<AppState>) -> Result<Json<Value>> {
    state.vector_store.reset_collection().await?;

    let name = state.vector_store.collection_name();
    tracing::warn!(collection = name, "Collection reset");

    Ok(Json(json!({
        "message": format!("Collection {} reset successfully", name)
    })))
}
