mod common;

use common::mocks::{MOCK_USAGE, MockEmbedder, MockLLMClient};
use common::seeded_store;
use futures::StreamExt;
use gemelo::agents::twin::APOLOGY;
use gemelo::db::InMemoryVectorStore;
use gemelo::llm::Role;
use gemelo::types::ChatMessage;
use gemelo::utils::toml_config::AgentConfig;
use gemelo::{AgentSettings, Embedder, PromptSet, TwinAgent, VectorStore};
use std::sync::Arc;

const ANSWER: &str = "I write Rust backend services every day.";

async fn agent_with(llm: MockLLMClient) -> TwinAgent {
    let embedder = MockEmbedder::default();
    let store = seeded_store(&embedder).await;
    let settings = AgentSettings::default();
    let prompts = PromptSet::with_defaults(&settings.persona_name);
    TwinAgent::new(Arc::new(llm), Arc::new(embedder), store, settings, prompts)
}

#[tokio::test]
async fn test_relevant_query_is_answered_from_context() {
    let llm = MockLLMClient::new("SI", ANSWER);
    let agent = agent_with(llm.clone()).await;

    let response = agent.process_message("Do you know Rust?", vec![]).await;

    assert_eq!(response.response, ANSWER);
    assert_eq!(response.sources.len(), 3);
    assert!(response.sources[0].is_cv);
    assert_eq!(response.sources[0].relevance, 1.0);
    assert!(response.thought_process.contains("needs document search"));
    assert!(response.thought_process.contains("Main sources: resume"));

    let usage = response.usage.unwrap();
    assert_eq!(usage.total_tokens, MOCK_USAGE.total_tokens * 2);

    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    let question = calls[1].last().unwrap();
    assert_eq!(question.role, Role::User);
    assert!(question.content.contains("CONTEXT:"));
    assert!(question.content.contains("Backend engineer writing Rust services."));
    assert!(question.content.contains("QUESTION: Do you know Rust?"));
}

#[tokio::test]
async fn test_irrelevant_query_gets_fallback() {
    let llm = MockLLMClient::new("SI", ANSWER);
    let agent = agent_with(llm.clone()).await;

    let response = agent
        .process_message("What is your favourite food?", vec![])
        .await;

    assert!(response.response.contains("Agustín Modia"));
    assert!(response.response.contains("couldn't find information"));
    assert!(response.thought_process.contains("fallback"));
    // Only the classification call reached the model
    assert_eq!(llm.calls().len(), 1);
}

#[tokio::test]
async fn test_general_chat_skips_retrieval() {
    let llm = MockLLMClient::new("NO", "Hello! Nice to meet you.");
    let agent = agent_with(llm.clone()).await;

    let response = agent.process_message("Hi there", vec![]).await;

    assert_eq!(response.response, "Hello! Nice to meet you.");
    assert!(response.sources.is_empty());
    assert!(response.thought_process.contains("no document search needed"));

    let calls = llm.calls();
    let question = calls[1].last().unwrap();
    assert_eq!(question.content, "Hi there");
}

#[tokio::test]
async fn test_classification_error_defaults_to_search() {
    let llm = MockLLMClient::failing_classification(ANSWER);
    let agent = agent_with(llm).await;

    let response = agent.process_message("Tell me about Rust", vec![]).await;

    assert_eq!(response.response, ANSWER);
    assert!(!response.sources.is_empty());
    assert!(response.thought_process.contains("Classification error"));
}

#[tokio::test]
async fn test_generation_error_returns_apology() {
    let llm = MockLLMClient::failing_answers("SI");
    let agent = agent_with(llm).await;

    let response = agent.process_message("Do you know Rust?", vec![]).await;

    assert_eq!(response.response, APOLOGY);
    assert!(response.thought_process.contains("Response generation error"));
}

#[tokio::test]
async fn test_empty_collection_falls_back() {
    let embedder = MockEmbedder::default();
    let store = Arc::new(InMemoryVectorStore::new("empty", embedder.dimensions()));
    let settings = AgentSettings::default();
    let prompts = PromptSet::with_defaults(&settings.persona_name);
    let agent = TwinAgent::new(
        Arc::new(MockLLMClient::new("SI", ANSWER)),
        Arc::new(embedder),
        store.clone(),
        settings,
        prompts,
    );

    let response = agent.process_message("Do you know Rust?", vec![]).await;

    assert!(response.response.contains("couldn't find information"));
    assert!(response.sources.is_empty());
    // Searching creates the collection on demand
    assert!(store.collection_exists().await.unwrap());
}

#[tokio::test]
async fn test_history_window_limits_prior_turns() {
    let llm = MockLLMClient::new("NO", "Sure.");
    let agent = agent_with(llm.clone()).await;

    let history: Vec<ChatMessage> = (0..8)
        .map(|i| {
            if i % 2 == 0 {
                ChatMessage::user(format!("question {i}"))
            } else {
                ChatMessage::assistant(format!("answer {i}"))
            }
        })
        .collect();

    agent.process_message("And then?", history).await;

    let calls = llm.calls();
    let answer_call = &calls[1];
    // system + five most recent turns + question
    assert_eq!(answer_call.len(), 7);
    assert_eq!(answer_call[0].role, Role::System);
    assert_eq!(answer_call[1].content, "answer 3");
    assert_eq!(answer_call[5].content, "answer 7");
}

#[tokio::test]
async fn test_reconfigure_changes_threshold() {
    let llm = MockLLMClient::new("SI", ANSWER);
    let agent = agent_with(llm).await;

    let before = agent.process_message("Favourite food?", vec![]).await;
    assert!(before.response.contains("couldn't find information"));

    let config = AgentConfig {
        relevance_threshold: 0.0,
        ..AgentConfig::default()
    };
    agent.reconfigure(&config);
    assert_eq!(agent.settings().relevance_threshold, 0.0);

    let after = agent.process_message("Favourite food?", vec![]).await;
    assert_eq!(after.response, ANSWER);
}

#[tokio::test]
async fn test_streaming_answer_matches_batch() {
    let llm = MockLLMClient::new("SI", ANSWER);
    let agent = agent_with(llm).await;

    let chunks: Vec<String> = agent
        .process_message_streaming("Do you know Rust?", vec![])
        .await
        .collect()
        .await;

    assert!(chunks.len() > 1);
    assert_eq!(chunks.concat(), ANSWER);
}

#[tokio::test]
async fn test_streaming_fallback_is_single_chunk() {
    let llm = MockLLMClient::new("SI", ANSWER);
    let agent = agent_with(llm).await;

    let chunks: Vec<String> = agent
        .process_message_streaming("Favourite food?", vec![])
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains("couldn't find information"));
}

#[tokio::test]
async fn test_streaming_error_yields_apology_chunk() {
    let llm = MockLLMClient::failing_answers("SI");
    let agent = agent_with(llm).await;

    let chunks: Vec<String> = agent
        .process_message_streaming("Do you know Rust?", vec![])
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].starts_with("Sorry, an error occurred"));
}
