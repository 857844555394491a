use crate::agents::prompts::PromptSet;
use crate::db::VectorStore;
use crate::llm::{CompletionOptions, LLMClient, Message};
use crate::rag::Embedder;
use crate::types::{ChatMessage, ChatResponse, Result, ScoredChunk, SourceRef, TokenUsage};
use crate::utils::toml_config::AgentConfig;
use arc_swap::ArcSwap;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply used when generation fails.
pub const APOLOGY: &str = "Sorry, an error occurred while processing your message.";

/// Longest source excerpt returned to clients.
const SOURCE_EXCERPT_CHARS: usize = 150;
/// Longest summary excerpt written into the thought process.
const SUMMARY_EXCERPT_CHARS: usize = 100;

/// Retrieval and persona settings. Hot-reloadable.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    pub persona_name: String,
    pub relevance_threshold: f32,
    pub search_limit: u64,
    pub max_cv_chunks: usize,
    pub max_context_chunks: usize,
    pub history_window: usize,
}

impl From<&AgentConfig> for AgentSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            persona_name: config.persona_name.clone(),
            relevance_threshold: config.relevance_threshold,
            search_limit: config.search_limit,
            max_cv_chunks: config.max_cv_chunks,
            max_context_chunks: config.max_context_chunks,
            history_window: config.history_window,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

/// Everything the workflow learns about one query.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub query: String,
    pub history: Vec<ChatMessage>,
    pub needs_rag: bool,
    pub context: Vec<String>,
    pub sources: Vec<SourceRef>,
    pub best_score: f32,
    pub thought_process: String,
    pub response: String,
    pub usage: Option<TokenUsage>,
}

impl AgentState {
    pub fn new(query: impl Into<String>, history: Vec<ChatMessage>) -> Self {
        Self {
            query: query.into(),
            history,
            thought_process: "Starting query processing".to_string(),
            ..Default::default()
        }
    }

    fn note(&mut self, thought: impl AsRef<str>) {
        self.thought_process.push_str("\n\n");
        self.thought_process.push_str(thought.as_ref());
    }

    fn add_usage(&mut self, usage: Option<TokenUsage>) {
        self.usage = match (self.usage, usage) {
            (Some(a), Some(b)) => Some(a.merge(b)),
            (a, b) => a.or(b),
        };
    }
}

struct Profile {
    settings: AgentSettings,
    prompts: PromptSet,
}

/// The digital twin: answers questions about one person from their documents.
///
/// Each message runs a fixed workflow:
///
/// ```text
/// classify ──(needs documents)──► search ──► decide ──(relevant)──► generate
///     │                                        │
///     └────────(general chat)──────► generate  └──(not relevant)──► fallback
/// ```
pub struct TwinAgent {
    llm: Arc<dyn LLMClient>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    profile: ArcSwap<Profile>,
}

impl TwinAgent {
    pub fn new(
        llm: Arc<dyn LLMClient>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        settings: AgentSettings,
        prompts: PromptSet,
    ) -> Self {
        Self {
            llm,
            embedder,
            store,
            profile: ArcSwap::from_pointee(Profile { settings, prompts }),
        }
    }

    /// Applies new settings and reloads prompts from the configured directory.
    pub fn reconfigure(&self, config: &AgentConfig) {
        let settings = AgentSettings::from(config);
        let prompts = PromptSet::load(&config.prompts_dir, &settings.persona_name);
        self.profile.store(Arc::new(Profile { settings, prompts }));
        info!("Agent settings reloaded");
    }

    pub fn settings(&self) -> AgentSettings {
        self.profile.load().settings.clone()
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Answers one message.
    pub async fn process_message(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
    ) -> ChatResponse {
        let profile = self.profile.load_full();
        let mut state = self.prepare(message, history, &profile).await;

        if has_relevant_data(&state, &profile.settings) {
            self.generate(&mut state, &profile).await;
        } else {
            fallback(&mut state, &profile.settings);
        }

        ChatResponse {
            response: state.response,
            sources: state.sources,
            thought_process: state.thought_process,
            usage: state.usage,
        }
    }

    /// Answers one message as a stream of text chunks.
    ///
    /// Classification and retrieval finish before the stream is returned. A
    /// fallback answer arrives as a single chunk; errors end the stream with
    /// one apology chunk.
    pub async fn process_message_streaming(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
    ) -> BoxStream<'static, String> {
        let profile = self.profile.load_full();
        let mut state = self.prepare(message, history, &profile).await;

        if !has_relevant_data(&state, &profile.settings) {
            fallback(&mut state, &profile.settings);
            return stream::once(async move { state.response }).boxed();
        }

        let messages = answer_messages(&state, &profile);
        match self.llm.stream(&messages, &CompletionOptions::ANSWER).await {
            Ok(mut deltas) => {
                let chunks = async_stream::stream! {
                    while let Some(delta) = deltas.next().await {
                        match delta {
                            Ok(text) => yield text,
                            Err(e) => {
                                error!("Streaming failed mid-response: {}", e);
                                yield stream_error(&e);
                                break;
                            }
                        }
                    }
                };
                chunks.boxed()
            }
            Err(e) => {
                error!("Failed to start response stream: {}", e);
                stream::once(async move { stream_error(&e) }).boxed()
            }
        }
    }

    /// Runs classification and, when needed, retrieval.
    async fn prepare(
        &self,
        message: &str,
        history: Vec<ChatMessage>,
        profile: &Profile,
    ) -> AgentState {
        let mut state = AgentState::new(message, history);

        self.classify(&mut state, profile).await;
        if state.needs_rag {
            self.search(&mut state, &profile.settings).await;
            state.note(format!(
                "Best relevance score: {:.3} (threshold {:.2})",
                state.best_score, profile.settings.relevance_threshold
            ));
        }

        state
    }

    /// Decides whether the query needs the documents. Errors default to
    /// searching.
    async fn classify(&self, state: &mut AgentState, profile: &Profile) {
        let messages = [
            Message::system(profile.prompts.classify()),
            Message::user(format!(
                "Query: {}\n\nDecide whether this query needs specific information from the \
                 documents. Answer only 'SI' or 'NO'.",
                state.query
            )),
        ];

        match self.llm.complete(&messages, &CompletionOptions::CLASSIFY).await {
            Ok(completion) => {
                state.needs_rag = is_affirmative(&completion.content);
                state.add_usage(completion.usage);
                state.note(format!(
                    "Query classification: '{}'\nDecision: {}",
                    state.query,
                    if state.needs_rag {
                        "needs document search"
                    } else {
                        "no document search needed"
                    }
                ));
            }
            Err(e) => {
                warn!("Classification failed, searching documents: {}", e);
                state.needs_rag = true;
                state.note(format!("Classification error: {}", e));
            }
        }
    }

    async fn search(&self, state: &mut AgentState, settings: &AgentSettings) {
        match self.retrieve(&state.query, settings.search_limit).await {
            Ok(hits) => apply_hits(state, hits, settings),
            Err(e) => {
                error!("Knowledge search failed: {}", e);
                state.context.clear();
                state.sources.clear();
                state.best_score = 0.0;
                state.note(format!("RAG search error: {}", e));
            }
        }
    }

    async fn retrieve(&self, query: &str, limit: u64) -> Result<Vec<ScoredChunk>> {
        self.store.initialize_collection().await?;
        let vector = self.embedder.embed_one(query).await?;
        let hits = self.store.search(&vector, limit, None).await?;
        debug!(hits = hits.len(), "Retrieved candidate chunks");
        Ok(hits)
    }

    async fn generate(&self, state: &mut AgentState, profile: &Profile) {
        let messages = answer_messages(state, profile);

        match self.llm.complete(&messages, &CompletionOptions::ANSWER).await {
            Ok(completion) => {
                state.response = completion.content.trim().to_string();
                state.add_usage(completion.usage);
                let length = state.response.chars().count();
                state.note(format!("Response generated ({} characters)", length));
            }
            Err(e) => {
                error!("Response generation failed: {}", e);
                state.response = APOLOGY.to_string();
                state.note(format!("Response generation error: {}", e));
            }
        }
    }
}

/// Accepts "SI"/"SÍ"/"YES", ignoring case and surrounding punctuation.
fn is_affirmative(reply: &str) -> bool {
    let word = reply
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_uppercase();
    matches!(word.as_str(), "SI" | "SÍ" | "YES")
}

/// Keeps up to `max_cv_chunks` CV hits, then fills up to `max_context_chunks`
/// with the remaining hits in score order.
fn prioritize(hits: &[ScoredChunk], settings: &AgentSettings) -> Vec<ScoredChunk> {
    let (cv, other): (Vec<&ScoredChunk>, Vec<&ScoredChunk>) =
        hits.iter().partition(|hit| hit.metadata.is_cv());

    let mut selected: Vec<ScoredChunk> = cv
        .into_iter()
        .take(settings.max_cv_chunks)
        .cloned()
        .collect();

    let remaining = settings.max_context_chunks.saturating_sub(selected.len());
    selected.extend(other.into_iter().take(remaining).cloned());
    selected
}

fn apply_hits(state: &mut AgentState, hits: Vec<ScoredChunk>, settings: &AgentSettings) {
    state.best_score = hits.iter().map(|h| h.score).fold(0.0, f32::max);

    let selected = prioritize(&hits, settings);
    state.context = selected.iter().map(|hit| hit.text.clone()).collect();
    state.sources = selected.iter().map(source_ref).collect();

    state.note(format!(
        "RAG search: found {} relevant documents.",
        hits.len()
    ));

    if state.sources.is_empty() {
        return;
    }

    let main_sources: Vec<&str> = state
        .sources
        .iter()
        .take(2)
        .map(|s| s.file_name.as_str())
        .collect();
    let mut thought = format!("Main sources: {}", main_sources.join(", "));

    let mut summaries: Vec<String> = Vec::new();
    for source in &state.sources {
        if source.document_summary.is_empty() {
            continue;
        }
        let entry = format!(
            "{}: {}",
            source.file_name,
            excerpt(&source.document_summary, SUMMARY_EXCERPT_CHARS)
        );
        if !summaries.contains(&entry) {
            summaries.push(entry);
        }
        if summaries.len() == 2 {
            break;
        }
    }

    if !summaries.is_empty() {
        thought.push_str("\nDocument summaries:\n- ");
        thought.push_str(&summaries.join("\n- "));
    }

    // Sources sit directly under the search line
    state.thought_process.push('\n');
    state.thought_process.push_str(&thought);
}

fn source_ref(hit: &ScoredChunk) -> SourceRef {
    SourceRef {
        text: excerpt(&hit.text, SOURCE_EXCERPT_CHARS),
        source: hit.metadata.source.clone(),
        file_name: hit.metadata.file_name.clone(),
        document_summary: hit.metadata.document_summary.clone(),
        document_type: hit.metadata.document_type.clone(),
        relevance: hit.score,
        is_cv: hit.metadata.is_cv(),
    }
}

/// First `max` characters, with `...` appended when cut.
fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// The documents answer the query, or the query never needed them.
pub fn has_relevant_data(state: &AgentState, settings: &AgentSettings) -> bool {
    !state.needs_rag
        || (!state.context.is_empty() && state.best_score >= settings.relevance_threshold)
}

fn answer_messages(state: &AgentState, profile: &Profile) -> Vec<Message> {
    let window = profile.settings.history_window;
    let skip = state.history.len().saturating_sub(window);

    let mut messages = Vec::with_capacity(window + 2);
    messages.push(Message::system(profile.prompts.system()));
    messages.extend(state.history.iter().skip(skip).map(Message::from));

    let question = if state.context.is_empty() {
        state.query.clone()
    } else {
        format!(
            "Answer the following question using the provided context. Answer as {}, in first \
             person.\n\nCONTEXT:\n{}\n\nQUESTION: {}",
            profile.settings.persona_name,
            state.context.join("\n\n"),
            state.query
        )
    };
    messages.push(Message::user(question));

    messages
}

fn fallback(state: &mut AgentState, settings: &AgentSettings) {
    state.response = format!(
        "I'm the digital twin of {}, but I couldn't find information about that in my \
         documents. Could you ask me about my professional experience or rephrase the question?",
        settings.persona_name
    );
    state.note("No sufficiently relevant information found; answered with the fallback message");
    info!(
        best_score = state.best_score,
        threshold = settings.relevance_threshold,
        "Answered with fallback"
    );
}

fn stream_error(error: &crate::types::AppError) -> String {
    format!("Sorry, an error occurred: {}", error)
}
