use crate::types::{
    AppError, ChunkFilter, ChunkMetadata, CollectionInfo, EmbeddedChunk, Result, ScoredChunk,
    StoredChunk,
};
use async_trait::async_trait;
use qdrant_client::{
    Payload, Qdrant,
    qdrant::{
        Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
        DeletePointsBuilder, Distance, FieldType, Filter, OptimizersConfigDiffBuilder, PointId,
        PointStruct, ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder,
        VectorParamsBuilder, point_id::PointIdOptions,
    },
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::vectorstore::{MAX_SCROLL, VectorStore};

/// Payload fields with keyword indexes.
const INDEXED_FIELDS: [&str; 2] = ["metadata.file_name", "metadata.source"];

/// Qdrant-backed document collection.
///
/// Requires a running Qdrant instance (gRPC port, 6334 by default).
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimensions: u64,
}

impl QdrantStore {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: String,
        dimensions: u64,
    ) -> Result<Self> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Database(format!("Failed to create Qdrant client: {}", e)))?;

        info!(url, collection = %collection, "Qdrant client configured");

        Ok(Self {
            client,
            collection,
            dimensions,
        })
    }

    async fn create_collection(&self) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(self.dimensions, Distance::Cosine))
                    .optimizers_config(OptimizersConfigDiffBuilder::default().indexing_threshold(0)),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create collection: {}", e)))?;

        for field in INDEXED_FIELDS {
            self.client
                .create_field_index(
                    CreateFieldIndexCollectionBuilder::new(
                        &self.collection,
                        field,
                        FieldType::Keyword,
                    )
                    .wait(true),
                )
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to create index on {}: {}", field, e))
                })?;
        }

        info!(collection = %self.collection, "Created Qdrant collection");
        Ok(())
    }
}

/// Builds a `must` filter from the set fields, or `None` for an empty filter.
fn to_qdrant_filter(filter: &ChunkFilter) -> Option<Filter> {
    let mut conditions = Vec::new();

    if let Some(file_name) = &filter.file_name {
        conditions.push(Condition::matches("metadata.file_name", file_name.clone()));
    }
    if let Some(source) = &filter.source {
        conditions.push(Condition::matches("metadata.source", source.clone()));
    }

    if conditions.is_empty() {
        None
    } else {
        Some(Filter::must(conditions))
    }
}

fn point_id_to_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(num)) => num.to_string(),
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        None => String::new(),
    }
}

/// Reads `text` and `metadata` back out of a point payload.
fn parse_payload(
    payload: &HashMap<String, qdrant_client::qdrant::Value>,
) -> Option<(String, ChunkMetadata)> {
    let text = payload.get("text")?.as_str()?.to_string();
    let metadata: serde_json::Value = payload.get("metadata")?.clone().into();

    match serde_json::from_value(metadata) {
        Ok(metadata) => Some((text, metadata)),
        Err(e) => {
            warn!("Skipping point with unreadable metadata: {}", e);
            None
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn provider_name(&self) -> &'static str {
        "qdrant"
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| AppError::Database(format!("Failed to check collection: {}", e)))
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        if !self.collection_exists().await? {
            return Ok(CollectionInfo {
                name: self.collection.clone(),
                exists: false,
                points_count: 0,
                vector_size: self.dimensions,
            });
        }

        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get collection info: {}", e)))?;

        let result = info.result;
        let points_count = result
            .as_ref()
            .and_then(|r| r.points_count)
            .unwrap_or(0);
        let vector_size = result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| match v.config {
                Some(qdrant_client::qdrant::vectors_config::Config::Params(p)) => Some(p.size),
                _ => None,
            })
            .unwrap_or(self.dimensions);

        Ok(CollectionInfo {
            name: self.collection.clone(),
            exists: true,
            points_count,
            vector_size,
        })
    }

    async fn initialize_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            debug!(collection = %self.collection, "Collection already exists");
            return Ok(());
        }

        self.create_collection().await
    }

    async fn reset_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| AppError::Database(format!("Failed to delete collection: {}", e)))?;
            info!(collection = %self.collection, "Deleted Qdrant collection");
        }

        self.create_collection().await
    }

    async fn insert_chunks(&self, chunks: Vec<EmbeddedChunk>) -> Result<Vec<String>> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(chunks.len());
        let mut points = Vec::with_capacity(chunks.len());

        for embedded in chunks {
            let payload = Payload::try_from(serde_json::json!({
                "text": embedded.chunk.text,
                "metadata": embedded.chunk.metadata,
            }))
            .map_err(|e| AppError::Internal(format!("Failed to build payload: {}", e)))?;

            let id = uuid::Uuid::new_v4().to_string();
            points.push(PointStruct::new(id.clone(), embedded.embedding, payload));
            ids.push(id);
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(|e| AppError::Database(format!("Failed to upsert points: {}", e)))?;

        info!(count = ids.len(), "Inserted chunks into Qdrant");
        Ok(ids)
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: u64,
        filter: Option<&ChunkFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        let mut builder =
            SearchPointsBuilder::new(&self.collection, vector.to_vec(), limit).with_payload(true);

        if let Some(filter) = filter.and_then(to_qdrant_filter) {
            builder = builder.filter(filter);
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| AppError::Database(format!("Failed to search: {}", e)))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let (text, metadata) = parse_payload(&point.payload)?;
                Some(ScoredChunk {
                    id: point_id_to_string(point.id),
                    score: point.score,
                    text,
                    metadata,
                })
            })
            .collect())
    }

    async fn chunks_by_file_name(&self, file_name: &str) -> Result<Vec<StoredChunk>> {
        if !self.collection_exists().await? {
            warn!(file_name, "Cannot look up chunks: collection does not exist");
            return Ok(Vec::new());
        }

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .filter(Filter::must([Condition::matches(
                        "metadata.file_name",
                        file_name.to_string(),
                    )]))
                    .limit(MAX_SCROLL)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to scroll points: {}", e)))?;

        let chunks: Vec<StoredChunk> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let (text, metadata) = parse_payload(&point.payload)?;
                Some(StoredChunk {
                    id: point_id_to_string(point.id),
                    text,
                    metadata,
                })
            })
            .collect();

        debug!(file_name, count = chunks.len(), "Found chunks by file name");
        Ok(chunks)
    }

    async fn delete_by_filter(&self, filter: &ChunkFilter) -> Result<u64> {
        let Some(qdrant_filter) = to_qdrant_filter(filter) else {
            warn!("No filter given for deletion, nothing deleted");
            return Ok(0);
        };

        if !self.collection_exists().await? {
            return Ok(0);
        }

        // Qdrant's delete does not report how many points it removed
        let count = self
            .client
            .count(
                CountPointsBuilder::new(&self.collection)
                    .filter(qdrant_filter.clone())
                    .exact(true),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to count points: {}", e)))?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        if count == 0 {
            return Ok(0);
        }

        self.client
            .delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(qdrant_filter)
                    .wait(true),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete points: {}", e)))?;

        info!(count, "Deleted chunks from Qdrant");
        Ok(count)
    }

    async fn scroll_chunks(&self, limit: u32) -> Result<Vec<StoredChunk>> {
        if !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .scroll(
                ScrollPointsBuilder::new(&self.collection)
                    .limit(limit)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to scroll points: {}", e)))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let (text, metadata) = parse_payload(&point.payload)?;
                Some(StoredChunk {
                    id: point_id_to_string(point.id),
                    text,
                    metadata,
                })
            })
            .collect())
    }
}
