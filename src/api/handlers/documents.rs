use crate::{
    AppState,
    types::{
        AppError, ChunkFilter, DeleteDocumentResponse, DocumentListResponse, DocumentStatus,
        DocumentUploadResponse, Result,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use uuid::Uuid;

/// Upload a PDF for background ingestion
///
/// The file is stored in the uploads directory and processed in a background
/// task; poll `/api/documents/status/{document_id}` for progress.
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` field"),
    responses(
        (status = 200, description = "Document queued", body = DocumentUploadResponse),
        (status = 400, description = "Missing file or not a PDF"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "documents",
    security(("bearer" = []))
)]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(AppError::InvalidInput("Only PDF files are allowed".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;

        upload = Some((filename.replace(' ', "_"), bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(AppError::InvalidInput("Missing 'file' field".to_string()));
    };

    let document_id = Uuid::new_v4().to_string();
    let path = state.ingest.processor().save_upload(&bytes, &filename).await?;

    state
        .ingest
        .tracker()
        .set(&document_id, DocumentStatus::queued());

    let pipeline = state.ingest.clone();
    let task_id = document_id.clone();
    tokio::spawn(async move {
        pipeline.run(&path, &task_id).await;
    });

    tracing::info!(document_id = %document_id, filename = %filename, "Document queued");

    Ok(Json(DocumentUploadResponse {
        document_id,
        filename,
        status: "queued".to_string(),
        message: "Document received and queued for processing".to_string(),
    }))
}

/// Ingestion progress of an uploaded document
#[utoipa::path(
    get,
    path = "/api/documents/status/{document_id}",
    params(("document_id" = String, Path, description = "Id returned by the upload")),
    responses(
        (status = 200, description = "Current status", body = DocumentStatus),
        (status = 404, description = "Unknown document"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "documents",
    security(("bearer" = []))
)]
pub async fn document_status(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentStatus>> {
    state
        .ingest
        .tracker()
        .get(&document_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))
}

/// Summary of the document collection
#[utoipa::path(
    get,
    path = "/api/documents/list",
    responses(
        (status = 200, description = "Collection summary", body = DocumentListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "documents",
    security(("bearer" = []))
)]
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let info = state.vector_store.collection_info().await?;

    Ok(Json(DocumentListResponse {
        total_documents: info.points_count,
        collection_status: if info.exists { "active" } else { "not_created" }.to_string(),
        collection_name: info.name,
    }))
}

/// Delete every chunk of a document
#[utoipa::path(
    delete,
    path = "/api/documents/{document_name}",
    params(("document_name" = String, Path, description = "Stored file name, without extension")),
    responses(
        (status = 200, description = "Deletion result", body = DeleteDocumentResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "documents",
    security(("bearer" = []))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(document_name): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let deleted = state
        .vector_store
        .delete_by_filter(&ChunkFilter::by_file_name(&document_name))
        .await?;

    let response = if deleted == 0 {
        DeleteDocumentResponse {
            status: "warning".to_string(),
            message: format!("No vectors found for document {}", document_name),
        }
    } else {
        DeleteDocumentResponse {
            status: "success".to_string(),
            message: format!(
                "Document {} deleted successfully. Removed {} vectors.",
                document_name, deleted
            ),
        }
    };

    Ok(Json(response))
}
