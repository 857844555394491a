//! Retrieval Augmented Generation (RAG) ingestion side
//!
//! Turns uploaded documents into embedded chunks in the vector store, where
//! the twin agent retrieves them at question time.
//!
//! # Module Structure
//!
//! - [`rag::documents`](crate::rag::documents) - Upload storage, text extraction, chunk metadata
//! - [`rag::chunker`](crate::rag::chunker) - Page-aware paragraph chunking and summaries
//! - [`rag::embeddings`](crate::rag::embeddings) - Dense embeddings (OpenAI `text-embedding-3-large`)
//! - [`rag::ingest`](crate::rag::ingest) - The end-to-end pipeline and its status tracker
//!
//! # Pipeline
//!
//! 1. **Extraction** - PDF text split into pages
//! 2. **Chunking** - Paragraphs grouped into `[Page N]`-labeled chunks
//! 3. **Embedding** - One vector per chunk
//! 4. **Storage** - Chunks and vectors upserted into the collection

pub mod chunker;
pub mod documents;
pub mod embeddings;
pub mod ingest;

pub use chunker::{Chunker, Page};
pub use documents::DocumentProcessor;
pub use embeddings::Embedder;
pub use ingest::{IngestPipeline, IngestTracker};
