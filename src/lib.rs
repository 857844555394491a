//! # Gemelo - Digital Twin Server
//!
//! A chat backend that answers questions as a specific person, grounded in
//! that person's documents (primarily a résumé) through retrieval-augmented
//! generation.
//!
//! ## Overview
//!
//! Every chat message runs the twin's workflow:
//!
//! 1. **Classify** - does the question need the documents?
//! 2. **Search** - embed the question and retrieve chunks, CV first
//! 3. **Decide** - is the best hit above the relevance threshold?
//! 4. **Generate** - answer in first person from the context, or fall back to
//!    a templated reply when nothing relevant was found
//!
//! Documents reach the vector store through the ingestion pipeline: PDF text is
//! split into `[Page N]`-labeled paragraph chunks, embedded, and stored.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use gemelo::{AppState, GemeloConfigManager, api};
//! use std::sync::Arc;
//!
//! let config = Arc::new(GemeloConfigManager::new("gemelo.toml")?);
//! let state = AppState::new(config, llm, embedder, vector_store, history);
//! let app = api::create_router(state);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `openai` | OpenAI chat and embeddings (default) |
//! | `qdrant` | Qdrant vector store (default) |
//!
//! ## Modules
//!
//! - [`agents`] - The twin agent and its prompts
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - JWT authentication and middleware
//! - [`cli`] - Command-line interface and maintenance commands
//! - [`db`] - Vector store and chat history
//! - [`llm`] - LLM client abstraction and OpenAI client
//! - [`rag`] - Document processing, chunking, embeddings, ingestion
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration with hot reload

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// The digital twin agent.
pub mod agents;
/// HTTP API handlers and routes.
pub mod api;
/// JWT authentication and middleware.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Vector store and chat history storage.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use agents::{AgentSettings, PromptSet, TwinAgent};
pub use db::{ChatHistoryStore, InMemoryVectorStore, VectorStore};
pub use llm::LLMClient;
pub use rag::{DocumentProcessor, Embedder, IngestPipeline, IngestTracker};
pub use types::{AppError, Result};
pub use utils::toml_config::{GemeloConfig, GemeloConfigManager};

use crate::auth::jwt::AuthService;
use crate::rag::Chunker;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config: Arc<GemeloConfigManager>,
    /// Admin login and token verification
    pub auth_service: Arc<AuthService>,
    /// The twin answering chat messages
    pub agent: Arc<TwinAgent>,
    /// Document collection
    pub vector_store: Arc<dyn VectorStore>,
    /// Stored exchanges per user
    pub history: Arc<ChatHistoryStore>,
    /// Upload processing and its status tracker
    pub ingest: IngestPipeline,
}

impl AppState {
    /// Wires the services together from the current configuration.
    ///
    /// The agent follows later configuration reloads.
    pub fn new(
        config: Arc<GemeloConfigManager>,
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        history: Arc<ChatHistoryStore>,
    ) -> Self {
        let current = config.config();

        let auth_service = Arc::new(AuthService::new(
            current.auth.secret_key.clone(),
            current.auth.access_token_expire_minutes,
            current.auth.admin_user.clone(),
            &current.auth.admin_password,
        ));

        let settings = AgentSettings::from(&current.agent);
        let prompts = PromptSet::load(&current.agent.prompts_dir, &settings.persona_name);
        let agent = Arc::new(TwinAgent::new(
            llm,
            embedder.clone(),
            vector_store.clone(),
            settings,
            prompts,
        ));

        let reloadable = Arc::clone(&agent);
        config.on_reload(move |cfg| reloadable.reconfigure(&cfg.agent));

        let processor = Arc::new(DocumentProcessor::new(
            current.documents.uploads_dir.clone(),
            Chunker::new(current.documents.chunk_size, current.documents.chunk_overlap),
        ));
        let ingest = IngestPipeline::new(
            processor,
            embedder,
            vector_store.clone(),
            IngestTracker::new(),
        );

        Self {
            config,
            auth_service,
            agent,
            vector_store,
            history,
            ingest,
        }
    }
}
