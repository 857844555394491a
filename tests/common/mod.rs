#![allow(dead_code)]

pub mod mocks;

use gemelo::db::{ChatHistoryStore, InMemoryVectorStore, VectorStore};
use gemelo::rag::Embedder;
use gemelo::types::{ChunkMetadata, DocumentChunk, EmbeddedChunk};
use gemelo::utils::toml_config::GemeloConfig;
use gemelo::{AppState, GemeloConfigManager, LLMClient};
use mocks::MockEmbedder;
use std::path::Path;
use std::sync::Arc;

pub const ADMIN_USER: &str = "admin-test";
pub const ADMIN_PASSWORD: &str = "test-password";
pub const COLLECTION: &str = "twin_test";

/// Defaults with test credentials, prompts from a missing directory (so the
/// built-in prompts are used) and uploads in `uploads_dir`.
pub fn test_config(uploads_dir: &Path) -> GemeloConfig {
    let mut config = GemeloConfig::default();
    config.auth.secret_key = "test-secret-key-at-least-32-characters-long".to_string();
    config.auth.admin_user = ADMIN_USER.to_string();
    config.auth.admin_password = ADMIN_PASSWORD.to_string();
    config.qdrant.collection_name = COLLECTION.to_string();
    config.documents.uploads_dir = uploads_dir.to_path_buf();
    config.agent.prompts_dir = uploads_dir.join("no-prompts");
    config
}

pub fn chunk(file_name: &str, text: &str, summary: &str) -> DocumentChunk {
    DocumentChunk {
        text: text.to_string(),
        metadata: ChunkMetadata {
            source: format!("uploads/{file_name}.pdf"),
            file_name: file_name.to_string(),
            chunk_id: 0,
            chunk_size: text.chars().count(),
            document_summary: summary.to_string(),
            document_type: "general".to_string(),
        },
    }
}

/// In-memory collection holding a small résumé and a hobby note.
pub async fn seeded_store(embedder: &MockEmbedder) -> Arc<InMemoryVectorStore> {
    let store = Arc::new(InMemoryVectorStore::new(COLLECTION, embedder.dimensions()));
    store.initialize_collection().await.unwrap();

    let chunks = vec![
        chunk(
            "resume",
            "[Page 1] Backend engineer writing Rust services.",
            "Résumé of a backend engineer",
        ),
        chunk(
            "resume",
            "[Page 1] Based in Montevideo, Uruguay.",
            "Résumé of a backend engineer",
        ),
        chunk("hobbies", "[Page 1] Plays the guitar on weekends.", "Hobbies"),
    ];

    let embedded = chunks
        .into_iter()
        .map(|chunk| EmbeddedChunk {
            embedding: embedder.vector(&chunk.text),
            chunk,
        })
        .collect();
    store.insert_chunks(embedded).await.unwrap();
    store
}

pub async fn test_state(
    uploads_dir: &Path,
    llm: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
) -> AppState {
    let config = Arc::new(GemeloConfigManager::from_config(test_config(uploads_dir)));
    let history = Arc::new(ChatHistoryStore::new_memory().await.unwrap());
    AppState::new(config, llm, embedder, store, history)
}
