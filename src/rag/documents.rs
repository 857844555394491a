use crate::rag::chunker::{Chunker, Page, summarize};
use crate::types::{AppError, ChunkMetadata, DocumentChunk, Result, is_cv_name};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File types the processor can extract text from.
const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Replaces every character outside `[A-Za-z0-9_.-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Name a document is stored under: the file name without its extension.
pub fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `"resume"` for résumé/CV files, `"general"` otherwise.
pub fn document_type(file_name: &str) -> &'static str {
    if is_cv_name(file_name) {
        "resume"
    } else {
        "general"
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

/// Stores uploads and turns documents into labeled chunks.
pub struct DocumentProcessor {
    uploads_dir: PathBuf,
    chunker: Chunker,
}

impl DocumentProcessor {
    pub fn new(uploads_dir: impl Into<PathBuf>, chunker: Chunker) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            chunker,
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Path an upload named `filename` would be stored at.
    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.uploads_dir.join(sanitize_filename(filename))
    }

    /// Writes an uploaded file into the uploads directory and returns its path.
    pub async fn save_upload(&self, bytes: &[u8], filename: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.uploads_dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create uploads dir: {}", e)))?;

        let path = self.upload_path(filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to save upload: {}", e)))?;

        info!(path = %path.display(), bytes = bytes.len(), "Saved uploaded file");
        Ok(path)
    }

    /// Extracts the non-empty pages of a document.
    ///
    /// PDF pages are separated by form feeds in the extracted text. Plain text
    /// and Markdown files are a single page.
    pub async fn extract_pages(&self, path: &Path) -> Result<Vec<Page>> {
        let text = match extension(path).as_deref() {
            Some("pdf") => {
                let owned = path.to_path_buf();
                tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
                    .await
                    .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))?
                    .map_err(|e| {
                        AppError::InvalidInput(format!(
                            "Failed to extract text from {}: {}",
                            path.display(),
                            e
                        ))
                    })?
            }
            Some("txt") | Some("md") => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to read {}: {}", path.display(), e)))?,
            _ => return Err(unsupported(path)),
        };

        Ok(split_pages(&text))
    }

    /// Extracts, summarizes and chunks a document.
    pub async fn process_file(&self, path: &Path) -> Result<Vec<DocumentChunk>> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "File {} does not exist",
                path.display()
            )));
        }

        if !extension(path).is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str())) {
            return Err(unsupported(path));
        }

        info!(path = %path.display(), "Processing document");

        let pages = self.extract_pages(path).await?;
        let file_name = document_name(path);
        let summary = summarize(&pages);
        debug!(file_name = %file_name, summary = %summary.chars().take(100).collect::<String>(), "Generated document summary");

        let doc_type = document_type(&file_name);
        let source = path.to_string_lossy().into_owned();

        let chunks: Vec<DocumentChunk> = self
            .chunker
            .chunk(&pages)
            .into_iter()
            .enumerate()
            .map(|(chunk_id, text)| DocumentChunk {
                metadata: ChunkMetadata {
                    source: source.clone(),
                    file_name: file_name.clone(),
                    chunk_id,
                    chunk_size: text.chars().count(),
                    document_summary: summary.clone(),
                    document_type: doc_type.to_string(),
                },
                text,
            })
            .collect();

        info!(file_name = %file_name, chunks = chunks.len(), "Document processed");
        Ok(chunks)
    }
}

fn unsupported(path: &Path) -> AppError {
    AppError::InvalidInput(format!(
        "Unsupported file type: {} (expected one of {})",
        path.display(),
        SUPPORTED_EXTENSIONS.join(", ")
    ))
}

/// Splits extracted text on form feeds into numbered, non-blank pages.
fn split_pages(text: &str) -> Vec<Page> {
    text.split('\u{c}')
        .enumerate()
        .filter(|(_, page)| !page.trim().is_empty())
        .map(|(i, page)| Page::new(i + 1, page))
        .collect()
}
