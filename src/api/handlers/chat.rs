use crate::{
    AppState,
    auth::middleware::AuthUser,
    db::history::{DEFAULT_CONTEXT_LIMIT, DEFAULT_HISTORY_LIMIT},
    types::{
        AppError, ChatHistoryItem, ChatMessage, ChatRequest, ChatResponse, HistoryQuery, Result,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use std::convert::Infallible;

/// Falls back to the stored conversation when the client sends no history.
async fn resolve_history(state: &AppState, session_id: &str, history: Vec<ChatMessage>) -> Vec<ChatMessage> {
    if !history.is_empty() {
        return history;
    }

    match state
        .history
        .recent_context(session_id, DEFAULT_CONTEXT_LIMIT)
        .await
    {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(session_id, "Could not load stored context: {}", e);
            Vec::new()
        }
    }
}

fn validate(payload: &ChatRequest) -> Result<()> {
    if payload.message.trim().is_empty() {
        return Err(AppError::InvalidInput("Message cannot be empty".to_string()));
    }
    Ok(())
}

/// Send a message to the twin
#[utoipa::path(
    post,
    path = "/api/chat/send",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat response", body = ChatResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "chat",
    security(("bearer" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    validate(&payload)?;

    let history = resolve_history(&state, &claims.sub, payload.history).await;
    let response = state.agent.process_message(&payload.message, history).await;

    state
        .history
        .save_message(&payload.message, &response.response, &claims.sub)
        .await?;

    Ok(Json(response))
}

/// Send a message and receive the answer as server-sent events
///
/// Each text chunk arrives as `data: <chunk>`; the stream ends with
/// `data: [DONE]`.
#[utoipa::path(
    post,
    path = "/api/chat/stream",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of answer chunks", content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "chat",
    security(("bearer" = []))
)]
pub async fn stream_message(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    validate(&payload)?;

    let history = resolve_history(&state, &claims.sub, payload.history).await;
    let mut chunks = state
        .agent
        .process_message_streaming(&payload.message, history)
        .await;

    let store = state.history.clone();
    let session_id = claims.sub;
    let message = payload.message;

    let events = async_stream::stream! {
        let mut full = String::new();

        while let Some(chunk) = chunks.next().await {
            full.push_str(&chunk);
            yield Ok(Event::default().data(chunk));
        }

        if let Err(e) = store.save_message(&message, &full, &session_id).await {
            tracing::error!(session_id = %session_id, "Failed to save streamed exchange: {}", e);
        }

        yield Ok(Event::default().data("[DONE]"));
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Stored exchanges of the current user, oldest first
#[utoipa::path(
    get,
    path = "/api/chat/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Chat history", body = Vec<ChatHistoryItem>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "chat",
    security(("bearer" = []))
)]
pub async fn get_history(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<ChatHistoryItem>>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let items = state.history.chat_history(&claims.sub, limit).await?;
    Ok(Json(items))
}

/// Delete the current user's history
#[utoipa::path(
    delete,
    path = "/api/chat/history",
    responses(
        (status = 200, description = "History cleared"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "chat",
    security(("bearer" = []))
)]
pub async fn clear_history(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Value>> {
    let removed = state.history.clear_history(&claims.sub).await?;
    tracing::info!(session_id = %claims.sub, removed, "Chat history cleared");

    Ok(Json(json!({ "message": "Chat history cleared successfully" })))
}
