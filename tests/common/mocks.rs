//! Mock implementations for testing.
//!
//! Scripted LLM and keyword embedder shared by the integration tests, so the
//! retrieval workflow runs without network calls.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use gemelo::llm::{Completion, CompletionOptions, LLMClient, LLMStream, Message};
use gemelo::rag::Embedder;
use gemelo::types::{AppError, Result, TokenUsage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Usage reported for every successful mock completion.
pub const MOCK_USAGE: TokenUsage = TokenUsage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

/// Mock LLM client with one reply for classification and one for answers.
///
/// Calls made with [`CompletionOptions::CLASSIFY`] get the classification
/// reply; everything else gets the answer. Every message list sent is
/// recorded.
#[derive(Clone)]
pub struct MockLLMClient {
    classification: Option<String>,
    answer: Option<String>,
    calls: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl MockLLMClient {
    pub fn new(classification: &str, answer: &str) -> Self {
        Self {
            classification: Some(classification.to_string()),
            answer: Some(answer.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Classification works, answering fails.
    pub fn failing_answers(classification: &str) -> Self {
        Self {
            classification: Some(classification.to_string()),
            answer: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Classification fails, answering works.
    pub fn failing_classification(answer: &str) -> Self {
        Self {
            classification: None,
            answer: Some(answer.to_string()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Message lists received so far.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().clone()
    }

    fn reply(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        self.calls.lock().push(messages.to_vec());

        let reply = if *options == CompletionOptions::CLASSIFY {
            &self.classification
        } else {
            &self.answer
        };
        reply
            .clone()
            .ok_or_else(|| AppError::LLM("Mock LLM failure".to_string()))
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let content = self.reply(messages, options)?;
        Ok(Completion {
            content,
            usage: Some(MOCK_USAGE),
        })
    }

    async fn stream(&self, messages: &[Message], options: &CompletionOptions) -> Result<LLMStream> {
        let content = self.reply(messages, options)?;
        let deltas: Vec<Result<String>> = content
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(stream::iter(deltas).boxed())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Embeds text as keyword presence: dimension `i` is 1.0 when the text
/// contains `keywords[i]` (case-insensitive). Text without any keyword maps
/// to the zero vector, which scores 0.0 against everything.
#[derive(Clone)]
pub struct MockEmbedder {
    keywords: Vec<String>,
}

impl MockEmbedder {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|k| if lower.contains(k.as_str()) { 1.0 } else { 0.0 })
            .collect()
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(&["rust", "montevideo", "guitar", "python"])
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> u64 {
        self.keywords.len() as u64
    }
}
