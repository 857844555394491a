//! `show-metadata`: summarizes the documents stored in the collection.

use crate::cli::output::Output;
use crate::db::VectorStore;
use crate::types::{Result, StoredChunk};

/// Chunks inspected per run.
pub const SAMPLE_LIMIT: u32 = 100;
const SAMPLE_CHARS: usize = 150;

/// One stored document as seen through its chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOverview {
    pub file_name: String,
    pub document_type: String,
    pub document_summary: String,
    pub chunk_count: usize,
    pub sample_text: String,
}

/// Groups chunks by file name, keeping first-seen order.
pub fn group_by_file(chunks: &[StoredChunk]) -> Vec<DocumentOverview> {
    let mut documents: Vec<DocumentOverview> = Vec::new();

    for chunk in chunks {
        let file_name = if chunk.metadata.file_name.is_empty() {
            "unknown"
        } else {
            chunk.metadata.file_name.as_str()
        };

        match documents.iter_mut().find(|d| d.file_name == file_name) {
            Some(doc) => doc.chunk_count += 1,
            None => documents.push(DocumentOverview {
                file_name: file_name.to_string(),
                document_type: chunk.metadata.document_type.clone(),
                document_summary: chunk.metadata.document_summary.clone(),
                chunk_count: 1,
                sample_text: sample(&chunk.text),
            }),
        }
    }

    documents
}

fn sample(text: &str) -> String {
    if text.chars().count() > SAMPLE_CHARS {
        let head: String = text.chars().take(SAMPLE_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

/// Prints the collection summary.
pub async fn run(store: &dyn VectorStore, output: &Output) -> Result<()> {
    output.section("Stored documents");
    output.field("backend", store.provider_name());
    output.field("collection", store.collection_name());

    let info = store.collection_info().await?;
    if !info.exists {
        output.warn(&format!("Collection {} does not exist", info.name));
        return Ok(());
    }

    output.field("chunks", &info.points_count.to_string());
    if info.points_count == 0 {
        output.info("The collection holds no documents");
        return Ok(());
    }

    let limit = info.points_count.min(u64::from(SAMPLE_LIMIT)) as u32;
    let chunks = store.scroll_chunks(limit).await?;
    let documents = group_by_file(&chunks);

    output.field("documents", &documents.len().to_string());
    for doc in &documents {
        output.document(doc);
    }

    Ok(())
}
