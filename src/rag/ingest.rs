//! Document ingestion: extract, chunk, embed, store.
//!
//! Uploads are ingested in a background task; their progress is kept in an
//! [`IngestTracker`] that the status endpoint reads. The CLI runs the same
//! steps synchronously through [`IngestPipeline::ingest_file`].

use crate::db::VectorStore;
use crate::rag::documents::DocumentProcessor;
use crate::rag::embeddings::{Embedder, embed_chunks};
use crate::types::{DocumentStatus, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

impl DocumentStatus {
    pub fn queued() -> Self {
        Self::new("queued", 0.0, "Document queued for processing")
    }

    pub fn processing(progress: f32, message: impl Into<String>) -> Self {
        Self::new("processing", progress, message)
    }

    pub fn completed(chunks: usize) -> Self {
        Self::new(
            "completed",
            1.0,
            format!("Processing completed. Indexed {} chunks.", chunks),
        )
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::new("failed", 0.0, format!("Error: {}", error))
    }

    /// Completed or failed; nothing will update it again.
    pub fn is_finished(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }

    fn new(status: &str, progress: f32, message: impl Into<String>) -> Self {
        Self {
            status: status.to_string(),
            progress,
            message: message.into(),
        }
    }
}

/// Statuses kept before finished ones start being evicted.
pub const MAX_TRACKED: usize = 1000;

struct Tracked {
    status: DocumentStatus,
    updated: u64,
}

#[derive(Default)]
struct Statuses {
    entries: HashMap<String, Tracked>,
    clock: u64,
}

/// In-process map of document id to ingestion status.
///
/// Statuses are lost on restart. Past `capacity` entries, the least recently
/// updated completed or failed documents are dropped; queued and processing
/// ones are always kept.
#[derive(Clone)]
pub struct IngestTracker {
    statuses: Arc<RwLock<Statuses>>,
    capacity: usize,
}

impl Default for IngestTracker {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED)
    }
}

impl IngestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            statuses: Arc::new(RwLock::new(Statuses::default())),
            capacity,
        }
    }

    pub fn set(&self, document_id: &str, status: DocumentStatus) {
        let mut statuses = self.statuses.write();
        statuses.clock += 1;
        let updated = statuses.clock;
        statuses
            .entries
            .insert(document_id.to_string(), Tracked { status, updated });
        evict_finished(&mut statuses, self.capacity);
    }

    pub fn get(&self, document_id: &str) -> Option<DocumentStatus> {
        self.statuses
            .read()
            .entries
            .get(document_id)
            .map(|t| t.status.clone())
    }

    pub fn len(&self) -> usize {
        self.statuses.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.read().entries.is_empty()
    }
}

fn evict_finished(statuses: &mut Statuses, capacity: usize) {
    let excess = statuses.entries.len().saturating_sub(capacity);
    if excess == 0 {
        return;
    }

    let mut finished: Vec<(u64, String)> = statuses
        .entries
        .iter()
        .filter(|(_, t)| t.status.is_finished())
        .map(|(id, t)| (t.updated, id.clone()))
        .collect();
    finished.sort_unstable();

    for (_, id) in finished.into_iter().take(excess) {
        statuses.entries.remove(&id);
    }
    debug!(tracked = statuses.entries.len(), "Evicted finished ingest statuses");
}

/// Runs documents through extraction, embedding and storage.
#[derive(Clone)]
pub struct IngestPipeline {
    processor: Arc<DocumentProcessor>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    tracker: IngestTracker,
}

impl IngestPipeline {
    pub fn new(
        processor: Arc<DocumentProcessor>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        tracker: IngestTracker,
    ) -> Self {
        Self {
            processor,
            embedder,
            store,
            tracker,
        }
    }

    pub fn tracker(&self) -> &IngestTracker {
        &self.tracker
    }

    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    /// Ingests `path`, recording each step under `document_id`.
    ///
    /// Failures end in a `failed` status rather than an error.
    pub async fn run(&self, path: &Path, document_id: &str) {
        match self.ingest_tracked(path, document_id).await {
            Ok(count) => {
                info!(document_id, chunks = count, "Document processed successfully");
                self.tracker.set(document_id, DocumentStatus::completed(count));
            }
            Err(e) => {
                error!(document_id, "Error processing document: {}", e);
                self.tracker.set(document_id, DocumentStatus::failed(e));
            }
        }
    }

    async fn ingest_tracked(&self, path: &Path, document_id: &str) -> Result<usize> {
        self.tracker.set(
            document_id,
            DocumentStatus::processing(0.1, "Extracting text from document..."),
        );
        let chunks = self.processor.process_file(path).await?;

        self.tracker.set(
            document_id,
            DocumentStatus::processing(0.4, "Generating embeddings..."),
        );
        let embedded = embed_chunks(self.embedder.as_ref(), chunks).await?;

        self.tracker.set(
            document_id,
            DocumentStatus::processing(0.7, "Storing vectors..."),
        );
        self.store.initialize_collection().await?;
        let ids = self.store.insert_chunks(embedded).await?;

        Ok(ids.len())
    }

    /// Ingests `path` without status tracking and returns the chunk count.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize> {
        self.store.initialize_collection().await?;

        let chunks = self.processor.process_file(path).await?;
        let embedded = embed_chunks(self.embedder.as_ref(), chunks).await?;
        let ids = self.store.insert_chunks(embedded).await?;

        info!(path = %path.display(), chunks = ids.len(), "Document ingested");
        Ok(ids.len())
    }
}
