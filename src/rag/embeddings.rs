use crate::types::{AppError, DocumentChunk, EmbeddedChunk, Result};
use async_trait::async_trait;

/// Turns text into dense vectors for the vector store.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds each text, preserving order. Empty input yields empty output.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> u64;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLM("Embedding response was empty".to_string()))
    }
}

/// Embeds the chunks' texts in one batch and pairs each chunk with its vector.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<DocumentChunk>,
) -> Result<Vec<EmbeddedChunk>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(AppError::LLM(format!(
            "Expected {} embeddings, got {}",
            chunks.len(),
            embeddings.len()
        )));
    }

    Ok(chunks
        .into_iter()
        .zip(embeddings)
        .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
        .collect())
}

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbedder;

#[cfg(feature = "openai")]
mod openai {
    use super::Embedder;
    use crate::llm::openai::{map_openai_error, openai_client};
    use crate::types::{AppError, Result};
    use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Embeddings through the OpenAI API.
    ///
    /// Rate-limited calls are retried after a fixed delay, 3 attempts in
    /// total by default. Any other error fails the call at once.
    pub struct OpenAIEmbedder {
        client: Client<OpenAIConfig>,
        model: String,
        dimensions: u64,
        max_attempts: u32,
        retry_delay: Duration,
    }

    impl OpenAIEmbedder {
        pub fn new(api_key: String, api_base: String, model: String, dimensions: u64) -> Self {
            Self {
                client: openai_client(api_key, api_base),
                model,
                dimensions,
                max_attempts: 3,
                retry_delay: Duration::from_secs(5),
            }
        }

        /// Overrides the retry policy. `max_attempts` counts the first call.
        pub fn with_retry(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
            self.max_attempts = max_attempts.max(1);
            self.retry_delay = retry_delay;
            self
        }

        async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(texts.to_vec())
                .build()
                .map_err(|e| AppError::LLM(format!("Failed to build embedding request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(map_openai_error)?;

            let mut data = response.data;
            data.sort_by_key(|d| d.index);
            Ok(data.into_iter().map(|d| d.embedding).collect())
        }
    }

    #[async_trait]
    impl Embedder for OpenAIEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if texts.is_empty() {
                return Ok(Vec::new());
            }

            let mut attempt = 1;
            loop {
                match self.request(texts).await {
                    Ok(embeddings) => return Ok(embeddings),
                    Err(AppError::RateLimited(msg)) if attempt < self.max_attempts => {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            "Embedding rate limited, retrying: {}",
                            msg
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        tracing::error!("Embedding request failed: {}", e);
                        return Err(e);
                    }
                }
            }
        }

        fn dimensions(&self) -> u64 {
            self.dimensions
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChunkMetadata;

    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimensions(&self) -> u64 {
            2
        }
    }

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0, 1.0]])
        }

        fn dimensions(&self) -> u64 {
            2
        }
    }

    fn chunk(text: &str, id: usize) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            metadata: ChunkMetadata {
                source: "uploads/doc.pdf".to_string(),
                file_name: "doc".to_string(),
                chunk_id: id,
                chunk_size: text.len(),
                document_summary: String::new(),
                document_type: "general".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_embed_chunks_pairs_in_order() {
        let embedded = embed_chunks(&LengthEmbedder, vec![chunk("ab", 0), chunk("abcd", 1)])
            .await
            .unwrap();

        assert_eq!(embedded.len(), 2);
        assert_eq!(embedded[0].embedding, vec![2.0, 1.0]);
        assert_eq!(embedded[1].chunk.metadata.chunk_id, 1);
        assert_eq!(embedded[1].embedding, vec![4.0, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_chunks_empty() {
        assert!(embed_chunks(&ShortEmbedder, vec![]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_chunks_count_mismatch() {
        let result = embed_chunks(&ShortEmbedder, vec![chunk("a", 0), chunk("b", 1)]).await;
        assert!(matches!(result, Err(AppError::LLM(_))));
    }

    #[tokio::test]
    async fn test_embed_one() {
        assert_eq!(LengthEmbedder.embed_one("abc").await.unwrap(), vec![3.0, 1.0]);
    }

    #[cfg(feature = "openai")]
    mod openai_retry {
        use super::super::{Embedder, OpenAIEmbedder};
        use crate::llm::openai::stub::{StubServer, rate_limited_body, server_error_body};
        use crate::types::AppError;
        use axum::http::StatusCode;
        use std::time::Duration;

        fn embedder(server: &StubServer) -> OpenAIEmbedder {
            OpenAIEmbedder::new(
                "sk-test".to_string(),
                server.base_url.clone(),
                "text-embedding-3-large".to_string(),
                3072,
            )
            .with_retry(3, Duration::from_millis(20))
        }

        #[tokio::test]
        async fn test_rate_limit_gives_up_after_three_attempts() {
            let server =
                StubServer::start("/embeddings", StatusCode::TOO_MANY_REQUESTS, rate_limited_body())
                    .await;

            let result = tokio::time::timeout(
                Duration::from_secs(5),
                embedder(&server).embed(&["x".to_string()]),
            )
            .await
            .expect("retries should finish well within the timeout");

            assert!(matches!(result, Err(AppError::RateLimited(_))));
            assert_eq!(server.hits(), 3);
        }

        #[tokio::test]
        async fn test_other_errors_are_not_retried() {
            let server = StubServer::start(
                "/embeddings",
                StatusCode::INTERNAL_SERVER_ERROR,
                server_error_body(),
            )
            .await;

            let result = tokio::time::timeout(
                Duration::from_secs(5),
                embedder(&server).embed(&["x".to_string()]),
            )
            .await
            .expect("a server error should fail at once");

            assert!(matches!(result, Err(AppError::LLM(_))));
            assert_eq!(server.hits(), 1);
        }

        #[tokio::test]
        async fn test_empty_input_makes_no_request() {
            let server =
                StubServer::start("/embeddings", StatusCode::TOO_MANY_REQUESTS, rate_limited_body())
                    .await;

            assert!(embedder(&server).embed(&[]).await.unwrap().is_empty());
            assert_eq!(server.hits(), 0);
        }
    }
}
