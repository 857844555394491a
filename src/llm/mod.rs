//! LLM Provider Clients and Abstractions
//!
//! - [`LLMClient`] - the chat-completion trait the agent depends on
//! - [`openai::OpenAIClient`] - OpenAI (and compatible endpoints) via `async-openai`
//!
//! # Streaming
//!
//! `LLMClient::stream` returns a pinned stream of text deltas, which the chat
//! API forwards as server-sent events.

/// Core LLM client trait and message types.
pub mod client;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{Completion, CompletionOptions, LLMClient, LLMStream, Message, Role};
