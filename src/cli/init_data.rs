//! `init-data`: makes sure the seed document is in the collection.

use crate::db::VectorStore;
use crate::rag::IngestPipeline;
use crate::rag::documents::document_name;
use crate::types::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

pub const MAX_ATTEMPTS: u32 = 5;
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// What `init-data` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// The vector store never answered.
    StoreUnavailable,
    /// The file is not in the uploads directory.
    FileMissing(PathBuf),
    /// Chunks for the document are already stored.
    AlreadyIndexed { chunks: usize },
    /// The document was ingested now.
    Ingested { chunks: usize },
}

/// Polls `collection_info` until the store answers, sleeping `delay`
/// between attempts but not after the last one.
pub async fn wait_for_store(store: &dyn VectorStore, attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=attempts {
        match store.collection_info().await {
            Ok(_) => return true,
            Err(e) => {
                warn!(
                    "Waiting for the vector store (attempt {}/{}): {}",
                    attempt, attempts, e
                );
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    false
}

/// Ingests `uploads/<document>` unless chunks for it are already stored.
pub async fn init_data(
    store: &dyn VectorStore,
    pipeline: &IngestPipeline,
    document: &str,
    attempts: u32,
    delay: Duration,
) -> Result<InitOutcome> {
    info!("Checking initial data for {}", document);

    if !wait_for_store(store, attempts, delay).await {
        error!("Vector store unavailable after {} attempts", attempts);
        return Ok(InitOutcome::StoreUnavailable);
    }

    let path = pipeline.processor().upload_path(document);
    if !path.exists() {
        warn!("{} is not in the uploads directory", document);
        return Ok(InitOutcome::FileMissing(path));
    }

    // Stored file names carry no extension
    let stem = document_name(&path);
    let existing = if store.collection_exists().await? {
        store.chunks_by_file_name(&stem).await?.len()
    } else {
        info!("Collection does not exist yet");
        0
    };

    if existing > 0 {
        info!("{} already indexed with {} chunks", document, existing);
        return Ok(InitOutcome::AlreadyIndexed { chunks: existing });
    }

    info!("{} not indexed, processing", document);
    let chunks = pipeline.ingest_file(&path).await?;
    info!("{} indexed with {} chunks", document, chunks);
    Ok(InitOutcome::Ingested { chunks })
}
