use crate::AppState;
use crate::api::{ApiDoc, handlers};
use crate::auth::middleware::auth_middleware;
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Builds the full application router with its middleware stack.
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.config().server.body_limit_bytes;

    let public_routes = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/test", get(handlers::auth::auth_test))
        .route("/api-docs/openapi.json", get(openapi_json));

    let protected_routes = Router::new()
        .route("/api/auth/verify", get(handlers::auth::verify))
        // Chat
        .route("/api/chat/send", post(handlers::chat::send_message))
        .route("/api/chat/stream", post(handlers::chat::stream_message))
        .route(
            "/api/chat/history",
            get(handlers::chat::get_history).delete(handlers::chat::clear_history),
        )
        // Documents
        .route(
            "/api/documents/upload",
            post(handlers::documents::upload_document),
        )
        .route(
            "/api/documents/status/{document_id}",
            get(handlers::documents::document_status),
        )
        .route(
            "/api/documents/list",
            get(handlers::documents::list_documents),
        )
        .route(
            "/api/documents/{document_name}",
            delete(handlers::documents::delete_document),
        )
        // Admin
        .route(
            "/api/admin/reset_collection",
            post(handlers::admin::reset_collection),
        )
        .layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
