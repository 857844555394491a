//! Vector Store Abstraction Layer
//!
//! The twin keeps every document chunk in a single named collection. This
//! module defines the operations the rest of the server needs from that
//! collection, so the agent and the ingest pipeline run unchanged against
//! Qdrant in production and the in-memory store in tests.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       VectorStore Trait                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │ initialize │ insert_chunks │ search │ delete_by_filter │ ... │
//! └──────────────────────────────────────────────────────────────┘
//!            ▲                                  ▲
//!      ┌─────┴──────┐                   ┌───────┴────────┐
//!      │   Qdrant   │                   │    InMemory    │
//!      │ (service)  │                   │ (tests, local) │
//!      └────────────┘                   └────────────────┘
//! ```
//!
//! Points carry the payload `{ "text": ..., "metadata": { ... } }`, where the
//! metadata is a serialized [`ChunkMetadata`].

use crate::types::{
    AppError, ChunkFilter, ChunkMetadata, CollectionInfo, EmbeddedChunk, Result, ScoredChunk,
    StoredChunk,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

/// Upper bound on points returned by a single file-name lookup.
pub const MAX_SCROLL: u32 = 10_000;

/// Operations on the twin's document collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logging.
    fn provider_name(&self) -> &'static str;

    /// Name of the collection this store operates on.
    fn collection_name(&self) -> &str;

    async fn collection_exists(&self) -> Result<bool>;

    /// Existence, point count and vector size. A missing collection is
    /// reported with `exists = false`, not as an error.
    async fn collection_info(&self) -> Result<CollectionInfo>;

    /// Creates the collection and its payload indexes when missing.
    async fn initialize_collection(&self) -> Result<()>;

    /// Drops the collection (if present) and creates it again, empty.
    async fn reset_collection(&self) -> Result<()>;

    /// Stores chunks under fresh UUID point ids and returns the ids.
    async fn insert_chunks(&self, chunks: Vec<EmbeddedChunk>) -> Result<Vec<String>>;

    /// Nearest chunks by cosine similarity, best first.
    async fn search(
        &self,
        vector: &[f32],
        limit: u64,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>>;

    /// Every chunk stored for one document (up to [`MAX_SCROLL`]).
    async fn chunks_by_file_name(&self, file_name: &str) -> Result<Vec<StoredChunk>>;

    /// Deletes the chunks matching `filter` and returns how many were removed.
    /// An empty filter deletes nothing.
    async fn delete_by_filter(&self, filter: &ChunkFilter) -> Result<u64>;

    /// First `limit` chunks in storage order, without vectors.
    async fn scroll_chunks(&self, limit: u32) -> Result<Vec<StoredChunk>>;
}

// ============================================================================
// In-Memory Implementation
// ============================================================================

struct StoredPoint {
    id: String,
    vector: Vec<f32>,
    text: String,
    metadata: ChunkMetadata,
}

impl StoredPoint {
    fn to_stored_chunk(&self) -> StoredChunk {
        StoredChunk {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// In-memory vector store for tests and local runs without Qdrant.
///
/// Data is not persisted and will be lost when the process exits.
/// Uses cosine similarity for vector comparisons.
pub struct InMemoryVectorStore {
    name: String,
    dimensions: u64,
    points: Arc<RwLock<Option<Vec<StoredPoint>>>>,
}

impl InMemoryVectorStore {
    /// Create a store whose collection does not exist yet.
    pub fn new(name: impl Into<String>, dimensions: u64) -> Self {
        Self {
            name: name.into(),
            dimensions,
            points: Arc::new(RwLock::new(None)),
        }
    }

    /// Calculate cosine similarity between two vectors.
    pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn missing(&self) -> AppError {
        AppError::NotFound(format!("Collection '{}' not found", self.name))
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    fn collection_name(&self) -> &str {
        &self.name
    }

    async fn collection_exists(&self) -> Result<bool> {
        Ok(self.points.read().is_some())
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let points = self.points.read();
        Ok(CollectionInfo {
            name: self.name.clone(),
            exists: points.is_some(),
            points_count: points.as_ref().map_or(0, |p| p.len() as u64),
            vector_size: self.dimensions,
        })
    }

    async fn initialize_collection(&self) -> Result<()> {
        let mut points = self.points.write();
        if points.is_none() {
            *points = Some(Vec::new());
        }
        Ok(())
    }

    async fn reset_collection(&self) -> Result<()> {
        *self.points.write() = Some(Vec::new());
        Ok(())
    }

    async fn insert_chunks(&self, chunks: Vec<EmbeddedChunk>) -> Result<Vec<String>> {
        let mut guard = self.points.write();
        let points = guard.as_mut().ok_or_else(|| self.missing())?;

        let mut ids = Vec::with_capacity(chunks.len());
        for embedded in chunks {
            if embedded.embedding.len() as u64 != self.dimensions {
                return Err(AppError::InvalidInput(format!(
                    "Expected {} dimensions, got {}",
                    self.dimensions,
                    embedded.embedding.len()
                )));
            }

            let id = uuid::Uuid::new_v4().to_string();
            points.push(StoredPoint {
                id: id.clone(),
                vector: embedded.embedding,
                text: embedded.chunk.text,
                metadata: embedded.chunk.metadata,
            });
            ids.push(id);
        }

        Ok(ids)
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: u64,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let guard = self.points.read();
        let points = guard.as_ref().ok_or_else(|| self.missing())?;

        let mut results: Vec<ScoredChunk> = points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.metadata)))
            .map(|p| ScoredChunk {
                id: p.id.clone(),
                score: Self::cosine_similarity(vector, &p.vector),
                text: p.text.clone(),
                metadata: p.metadata.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit as usize);

        Ok(results)
    }

    async fn chunks_by_file_name(&self, file_name: &str) -> Result<Vec<StoredChunk>> {
        let guard = self.points.read();
        let Some(points) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let filter = ChunkFilter::by_file_name(file_name);
        Ok(points
            .iter()
            .filter(|p| filter.matches(&p.metadata))
            .take(MAX_SCROLL as usize)
            .map(StoredPoint::to_stored_chunk)
            .collect())
    }

    async fn delete_by_filter(&self, filter: &ChunkFilter) -> Result<u64> {
        if filter.is_empty() {
            return Ok(0);
        }

        let mut guard = self.points.write();
        let Some(points) = guard.as_mut() else {
            return Ok(0);
        };

        let before = points.len();
        points.retain(|p| !filter.matches(&p.metadata));
        Ok((before - points.len()) as u64)
    }

    async fn scroll_chunks(&self, limit: u32) -> Result<Vec<StoredChunk>> {
        let guard = self.points.read();
        Ok(guard
            .as_ref()
            .map(|points| {
                points
                    .iter()
                    .take(limit as usize)
                    .map(StoredPoint::to_stored_chunk)
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ============================================================================
// Tests
// ============================================================================
