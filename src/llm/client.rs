//! LLM client abstraction
//!
//! The twin agent talks to chat models through [`LLMClient`], so the
//! retrieval workflow can run against OpenAI in production and a scripted
//! mock in tests.

use crate::types::{ChatMessage, Result, TokenUsage};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Streamed completion text, one delta per item.
pub type LLMStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Run a chat completion over the given messages
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion>;

    /// Stream a chat completion as text deltas
    async fn stream(&self, messages: &[Message], options: &CompletionOptions) -> Result<LLMStream>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parses a client-supplied role. Unknown roles are treated as user turns.
    pub fn parse(role: &str) -> Self {
        match role.trim().to_ascii_lowercase().as_str() {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// A single chat turn sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role: Role::parse(&msg.role),
            content: msg.content.clone(),
        }
    }
}

/// Sampling parameters for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    /// Deterministic, very short answers for routing decisions
    pub const CLASSIFY: CompletionOptions = CompletionOptions {
        temperature: 0.1,
        max_tokens: 10,
    };

    /// Conversational answers
    pub const ANSWER: CompletionOptions = CompletionOptions {
        temperature: 0.7,
        max_tokens: 1024,
    };
}

/// Response from an LLM completion request
#[derive(Debug, Clone, Default)]
pub struct Completion {
    /// The text content of the response
    pub content: String,
    /// Token accounting, when the provider reports it
    pub usage: Option<TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::parse("system"), Role::System);
        assert_eq!(Role::parse("Assistant"), Role::Assistant);
        assert_eq!(Role::parse("user"), Role::User);
        assert_eq!(Role::parse("tool"), Role::User);
    }

    #[test]
    fn test_message_from_chat_message() {
        let msg = Message::from(&ChatMessage::assistant("hola"));
        assert_eq!(msg, Message::assistant("hola"));
    }

    #[test]
    fn test_option_presets() {
        assert_eq!(CompletionOptions::CLASSIFY.max_tokens, 10);
        assert_eq!(CompletionOptions::ANSWER.temperature, 0.7);
    }
}
