//! Configuration reloads reaching the running agent.

mod common;

use common::mocks::{MockEmbedder, MockLLMClient};
use common::seeded_store;
use gemelo::{AppState, ChatHistoryStore, GemeloConfigManager};
use std::sync::Arc;
use tempfile::TempDir;

fn write_config(dir: &TempDir, threshold: f32, persona: &str) -> std::path::PathBuf {
    let path = dir.path().join("gemelo.toml");
    let content = format!(
        r#"
[auth]
secret_key = "test-secret-key-at-least-32-characters-long"
admin_user = "admin-test"
admin_password = "test-password"

[agent]
persona_name = "{persona}"
prompts_dir = '{prompts}'
relevance_threshold = {threshold:.2}
"#,
        prompts = dir.path().join("prompts").display(),
    );
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_reload_reconfigures_agent() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, 0.3, "Agustín Modia");

    let config = Arc::new(GemeloConfigManager::new(&path).unwrap());
    let embedder = MockEmbedder::default();
    let store = seeded_store(&embedder).await;
    let state = AppState::new(
        config.clone(),
        Arc::new(MockLLMClient::new("SI", "From my résumé.")),
        Arc::new(embedder),
        store,
        Arc::new(ChatHistoryStore::new_memory().await.unwrap()),
    );

    let before = state.agent.process_message("Favourite food?", vec![]).await;
    assert!(before.response.contains("Agustín Modia"));
    assert!(before.response.contains("couldn't find information"));

    write_config(&dir, 0.0, "Ada");
    config.reload().unwrap();

    let settings = state.agent.settings();
    assert_eq!(settings.relevance_threshold, 0.0);
    assert_eq!(settings.persona_name, "Ada");

    let after = state.agent.process_message("Favourite food?", vec![]).await;
    assert_eq!(after.response, "From my résumé.");
}

#[tokio::test]
async fn test_prompts_directory_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("prompts")).unwrap();
    std::fs::write(
        dir.path().join("prompts").join("system.txt"),
        "Custom system prompt",
    )
    .unwrap();
    let path = write_config(&dir, 0.3, "Agustín Modia");

    let config = Arc::new(GemeloConfigManager::new(&path).unwrap());
    let llm = MockLLMClient::new("NO", "Hello!");
    let embedder = MockEmbedder::default();
    let store = seeded_store(&embedder).await;
    let state = AppState::new(
        config,
        Arc::new(llm.clone()),
        Arc::new(embedder),
        store,
        Arc::new(ChatHistoryStore::new_memory().await.unwrap()),
    );

    state.agent.process_message("Hi", vec![]).await;

    let calls = llm.calls();
    assert_eq!(calls[1][0].content, "Custom system prompt");
}
