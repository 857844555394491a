mod common;

use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use common::mocks::{MockEmbedder, MockLLMClient};
use common::{ADMIN_PASSWORD, ADMIN_USER, COLLECTION, seeded_store, test_state};
use gemelo::api::create_router;
use gemelo::types::{ChatHistoryItem, ChatResponse};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

const ANSWER: &str = "I write Rust backend services every day.";

struct TestApp {
    server: TestServer,
    token: String,
    uploads: TempDir,
}

async fn create_test_app() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let embedder = MockEmbedder::default();
    let store = seeded_store(&embedder).await;
    let state = test_state(
        uploads.path(),
        Arc::new(MockLLMClient::new("SI", ANSWER)),
        Arc::new(embedder),
        store,
    )
    .await;

    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    let token = login(&server).await;

    TestApp {
        server,
        token,
        uploads,
    }
}

async fn login(server: &TestServer) -> String {
    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "username": ADMIN_USER,
            "password": ADMIN_PASSWORD
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

// ============= Public routes =============

#[tokio::test]
async fn test_root_and_health() {
    let app = create_test_app().await;

    let response = app.server.get("/").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "online");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_auth_router_smoke_test() {
    let app = create_test_app().await;

    let response = app.server.get("/api/auth/test").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = create_test_app().await;

    let response = app.server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["paths"]["/api/chat/send"].is_object());
    assert!(body["paths"]["/api/documents/upload"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}

// ============= Authentication =============

#[tokio::test]
async fn test_login_wrong_password() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({
            "username": ADMIN_USER,
            "password": "wrong_password"
        }))
        .await;

    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_test_app().await;

    app.server
        .post("/api/chat/send")
        .json(&json!({ "message": "hi" }))
        .await
        .assert_status_unauthorized();

    app.server
        .get("/api/documents/list")
        .await
        .assert_status_unauthorized();

    app.server
        .post("/api/admin/reset_collection")
        .await
        .assert_status_unauthorized();

    let response = app
        .server
        .get("/api/auth/verify")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_verify_token() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/auth/verify")
        .authorization_bearer(&app.token)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"], ADMIN_USER);
    assert_eq!(body["authenticated"], true);
}

// ============= Chat =============

#[tokio::test]
async fn test_send_message_answers_and_records_history() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/chat/send")
        .authorization_bearer(&app.token)
        .json(&json!({ "message": "Do you know Rust?" }))
        .await;

    response.assert_status_ok();
    let body: ChatResponse = response.json();
    assert_eq!(body.response, ANSWER);
    assert!(!body.sources.is_empty());
    assert!(body.sources[0].is_cv);
    assert!(body.usage.is_some());

    let response = app
        .server
        .get("/api/chat/history")
        .authorization_bearer(&app.token)
        .await;
    response.assert_status_ok();
    let items: Vec<ChatHistoryItem> = response.json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].user_message, "Do you know Rust?");
    assert_eq!(items[0].assistant_response, ANSWER);
    assert_eq!(items[0].session_id, ADMIN_USER);
}

#[tokio::test]
async fn test_send_empty_message_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/chat/send")
        .authorization_bearer(&app.token)
        .json(&json!({ "message": "   " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_send_irrelevant_question_gets_fallback() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/chat/send")
        .authorization_bearer(&app.token)
        .json(&json!({ "message": "What is your favourite food?" }))
        .await;

    response.assert_status_ok();
    let body: ChatResponse = response.json();
    assert!(body.response.contains("couldn't find information"));
}

#[tokio::test]
async fn test_stream_message_ends_with_done() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/chat/stream")
        .authorization_bearer(&app.token)
        .json(&json!({ "message": "Do you know Rust?", "history": [] }))
        .await;

    response.assert_status_ok();
    let text = response.text();
    assert!(text.contains("backend "));
    assert!(text.trim_end().ends_with("[DONE]"));

    let items: Vec<ChatHistoryItem> = app
        .server
        .get("/api/chat/history")
        .authorization_bearer(&app.token)
        .await
        .json();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].assistant_response, ANSWER);
}

#[tokio::test]
async fn test_history_limit_and_clear() {
    let app = create_test_app().await;

    for question in ["Rust?", "Montevideo?", "Guitar?"] {
        app.server
            .post("/api/chat/send")
            .authorization_bearer(&app.token)
            .json(&json!({ "message": question }))
            .await
            .assert_status_ok();
    }

    let items: Vec<ChatHistoryItem> = app
        .server
        .get("/api/chat/history")
        .add_query_param("limit", 2)
        .authorization_bearer(&app.token)
        .await
        .json();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].user_message, "Montevideo?");
    assert_eq!(items[1].user_message, "Guitar?");

    app.server
        .delete("/api/chat/history")
        .authorization_bearer(&app.token)
        .await
        .assert_status_ok();

    let items: Vec<ChatHistoryItem> = app
        .server
        .get("/api/chat/history")
        .authorization_bearer(&app.token)
        .await
        .json();
    assert!(items.is_empty());
}

// ============= Documents =============

#[tokio::test]
async fn test_list_documents() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/documents/list")
        .authorization_bearer(&app.token)
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "total_documents": 3,
        "collection_status": "active",
        "collection_name": COLLECTION
    }));
}

#[tokio::test]
async fn test_delete_document() {
    let app = create_test_app().await;

    let response = app
        .server
        .delete("/api/documents/resume")
        .authorization_bearer(&app.token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "success");
    assert!(body["message"].as_str().unwrap().contains("Removed 2 vectors"));

    let response = app
        .server
        .delete("/api/documents/resume")
        .authorization_bearer(&app.token)
        .await;
    let body: Value = response.json();
    assert_eq!(body["status"], "warning");
}

#[tokio::test]
async fn test_unknown_document_status_is_404() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/documents/status/does-not-exist")
        .authorization_bearer(&app.token)
        .await;

    response.assert_status_not_found();
    response.assert_json(&json!({ "error": "Document not found" }));
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let app = create_test_app().await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"plain text".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );

    let response = app
        .server
        .post("/api/documents/upload")
        .authorization_bearer(&app.token)
        .multipart(form)
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_upload_pdf_is_queued() {
    let app = create_test_app().await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"%PDF-1.4 not a real document".to_vec())
            .file_name("my resume.pdf")
            .mime_type("application/pdf"),
    );

    let response = app
        .server
        .post("/api/documents/upload")
        .authorization_bearer(&app.token)
        .multipart(form)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "queued");
    assert_eq!(body["filename"], "my_resume.pdf");
    assert!(app.uploads.path().join("my_resume.pdf").exists());

    let document_id = body["document_id"].as_str().unwrap();
    app.server
        .get(&format!("/api/documents/status/{document_id}"))
        .authorization_bearer(&app.token)
        .await
        .assert_status_ok();
}

// ============= Admin =============

#[tokio::test]
async fn test_reset_collection_empties_it() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/admin/reset_collection")
        .authorization_bearer(&app.token)
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "message": format!("Collection {COLLECTION} reset successfully")
    }));

    let body: Value = app
        .server
        .get("/api/documents/list")
        .authorization_bearer(&app.token)
        .await
        .json();
    assert_eq!(body["total_documents"], 0);
}
