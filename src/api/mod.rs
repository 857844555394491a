//! HTTP API Handlers and Routes
//!
//! The REST API of the Gemelo server, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Public
//! - `GET /` - Service banner
//! - `GET /health` - Health check
//! - `POST /api/auth/login` - Login and receive a JWT
//! - `GET /api/auth/test` - Auth router smoke test
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! ## Chat (`/api/chat`)
//! - `POST /api/chat/send` - Ask the twin a question
//! - `POST /api/chat/stream` - Same, as server-sent events
//! - `GET /api/chat/history` - Stored exchanges
//! - `DELETE /api/chat/history` - Clear stored exchanges
//!
//! ## Documents (`/api/documents`)
//! - `POST /api/documents/upload` - Upload a PDF for ingestion
//! - `GET /api/documents/status/{id}` - Ingestion progress
//! - `GET /api/documents/list` - Collection summary
//! - `DELETE /api/documents/{name}` - Remove a document's chunks
//!
//! ## Admin
//! - `POST /api/admin/reset_collection` - Drop and recreate the collection
//!
//! # Authentication
//!
//! Everything except the public routes requires a valid JWT in the
//! `Authorization` header:
//! ```text
//! Authorization: Bearer <token>
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{
    ChatHistoryItem, ChatMessage, ChatRequest, ChatResponse, DeleteDocumentResponse,
    DocumentListResponse, DocumentStatus, DocumentUploadResponse, LoginRequest, SourceRef,
    TokenResponse, TokenUsage,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

pub use routes::create_router;

/// OpenAPI description of the HTTP API.
#[derive(OpenApi)]
#[openapi(
    info(title = "Gemelo Digital API", description = "Digital twin chat API with retrieval-augmented answers"),
    paths(
        handlers::health::root,
        handlers::health::health,
        handlers::auth::login,
        handlers::auth::auth_test,
        handlers::auth::verify,
        handlers::chat::send_message,
        handlers::chat::stream_message,
        handlers::chat::get_history,
        handlers::chat::clear_history,
        handlers::documents::upload_document,
        handlers::documents::document_status,
        handlers::documents::list_documents,
        handlers::documents::delete_document,
        handlers::admin::reset_collection,
    ),
    components(schemas(
        ChatMessage,
        ChatRequest,
        ChatResponse,
        SourceRef,
        TokenUsage,
        ChatHistoryItem,
        LoginRequest,
        TokenResponse,
        DocumentUploadResponse,
        DocumentStatus,
        DocumentListResponse,
        DeleteDocumentResponse,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Service status"),
        (name = "auth", description = "Admin authentication"),
        (name = "chat", description = "Conversation with the twin"),
        (name = "documents", description = "Knowledge base documents"),
        (name = "admin", description = "Collection administration"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
