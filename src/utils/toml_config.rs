//! TOML-based configuration for the Gemelo server
//!
//! Settings come from `gemelo.toml` and are then overridden by environment
//! variables using the deployment names (`OPENAI_API_KEY`, `QDRANT_URL`,
//! `SECRET_KEY`, ...). Every field has a default, so the server can start from
//! the environment alone.
//!
//! # Hot Reloading
//!
//! Agent behavior settings (prompts directory, relevance threshold, retrieval
//! limits) are re-read when the file changes. Use `GemeloConfigManager` for
//! thread-safe access to the current configuration.

use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Root configuration structure loaded from gemelo.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GemeloConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub openai: OpenAIConfig,
    #[serde(default)]
    pub qdrant: QdrantConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub agent: AgentConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_body_limit() -> usize {
    20 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

// ============= Authentication Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    #[serde(default = "default_token_expiry")]
    pub access_token_expire_minutes: i64,

    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Plain password or an argon2 PHC hash
    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

fn default_secret_key() -> String {
    "your-secret-key-here-change-in-production".to_string()
}

fn default_token_expiry() -> i64 {
    30
}

fn default_admin_user() -> String {
    "admin-gd".to_string()
}

fn default_admin_password() -> String {
    "change-in-production".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            access_token_expire_minutes: default_token_expiry(),
            admin_user: default_admin_user(),
            admin_password: default_admin_password(),
        }
    }
}

// ============= OpenAI Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base")]
    pub api_base: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u64,

    #[serde(default = "default_embedding_retries")]
    pub embedding_max_retries: u32,

    #[serde(default = "default_embedding_retry_delay")]
    pub embedding_retry_delay_secs: u64,
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_dimensions() -> u64 {
    3072
}

fn default_embedding_retries() -> u32 {
    3
}

fn default_embedding_retry_delay() -> u64 {
    5
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_openai_base(),
            model: default_chat_model(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            embedding_max_retries: default_embedding_retries(),
            embedding_retry_delay_secs: default_embedding_retry_delay(),
        }
    }
}

// ============= Qdrant Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// External URL (Qdrant Cloud or any reachable endpoint)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Internal network URL, used when `url` is unset
    #[serde(default)]
    pub private_url: Option<String>,

    #[serde(default = "default_qdrant_host")]
    pub host: String,

    #[serde(default = "default_qdrant_port")]
    pub port: u16,

    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

fn default_qdrant_host() -> String {
    "localhost".to_string()
}

fn default_qdrant_port() -> u16 {
    6334
}

fn default_collection_name() -> String {
    "gemelo_agustin_large".to_string()
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            private_url: None,
            host: default_qdrant_host(),
            port: default_qdrant_port(),
            collection_name: default_collection_name(),
        }
    }
}

/// Resolved Qdrant endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct QdrantEndpoint {
    pub url: String,
    pub api_key: Option<String>,
}

impl QdrantConfig {
    /// Picks the endpoint: external URL, then private URL, then host:port.
    /// The API key is only sent to the external URL.
    pub fn endpoint(&self) -> QdrantEndpoint {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            return QdrantEndpoint {
                url: url.clone(),
                api_key: self.api_key.clone(),
            };
        }

        if let Some(url) = self.private_url.as_ref().filter(|u| !u.is_empty()) {
            return QdrantEndpoint {
                url: url.clone(),
                api_key: None,
            };
        }

        QdrantEndpoint {
            url: format!("http://{}:{}", self.host, self.port),
            api_key: None,
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local path, `:memory:`, or a `libsql://` / `https://` Turso URL
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_database_url() -> String {
    "./data/gemelo.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            auth_token: None,
        }
    }
}

// ============= Documents Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Document ingested by `init-data` when missing from the collection
    #[serde(default = "default_seed_document")]
    pub seed_document: String,
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("./uploads")
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_seed_document() -> String {
    "Modia_Agustin_resume_gemelo_digital.pdf".to_string()
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            uploads_dir: default_uploads_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            seed_document: default_seed_document(),
        }
    }
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Person the twin speaks as
    #[serde(default = "default_persona_name")]
    pub persona_name: String,

    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Minimum best-hit score for answering from retrieved context
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,

    #[serde(default = "default_search_limit")]
    pub search_limit: u64,

    #[serde(default = "default_max_cv_chunks")]
    pub max_cv_chunks: usize,

    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    #[serde(default = "default_history_window")]
    pub history_window: usize,
}

fn default_persona_name() -> String {
    "Agustín Modia".to_string()
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("./prompts")
}

fn default_relevance_threshold() -> f32 {
    0.3
}

fn default_search_limit() -> u64 {
    10
}

fn default_max_cv_chunks() -> usize {
    3
}

fn default_max_context_chunks() -> usize {
    5
}

fn default_history_window() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona_name: default_persona_name(),
            prompts_dir: default_prompts_dir(),
            relevance_threshold: default_relevance_threshold(),
            search_limit: default_search_limit(),
            max_cv_chunks: default_max_cv_chunks(),
            max_context_chunks: default_max_context_chunks(),
            history_window: default_history_window(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid value for {name}: {value}")]
    InvalidEnvValue { name: String, value: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Watch error: {0}")]
    WatchError(#[from] notify::Error),
}

impl GemeloConfig {
    /// Loads the TOML file when it exists (defaults otherwise) and applies
    /// process environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reads only the TOML file. A missing file yields the defaults.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(
                "Configuration file {:?} not found, using defaults and environment",
                path
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Applies overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = parse_env("PORT", &v)?;
        }
        if let Some(v) = get("LOG_FORMAT") {
            self.server.log_format = v;
        }

        if let Some(v) = get("SECRET_KEY") {
            self.auth.secret_key = v;
        }
        if let Some(v) = get("ACCESS_TOKEN_EXPIRE_MINUTES") {
            self.auth.access_token_expire_minutes = parse_env("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
        }
        if let Some(v) = get("ADMIN_USER") {
            self.auth.admin_user = v;
        }
        if let Some(v) = get("ADMIN_PASSWORD") {
            self.auth.admin_password = v;
        }

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(v);
        }
        if let Some(v) = get("OPENAI_API_BASE") {
            self.openai.api_base = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.openai.model = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.openai.embedding_model = v;
        }

        if let Some(v) = get("QDRANT_URL") {
            self.qdrant.url = Some(v);
        }
        if let Some(v) = get("QDRANT_API_KEY") {
            self.qdrant.api_key = Some(v);
        }
        if let Some(v) = get("QDRANT_PRIVATE_URL") {
            self.qdrant.private_url = Some(v);
        }
        if let Some(v) = get("QDRANT_HOST") {
            self.qdrant.host = v;
        }
        if let Some(v) = get("QDRANT_PORT") {
            self.qdrant.port = parse_env("QDRANT_PORT", &v)?;
        }
        if let Some(v) = get("COLLECTION_NAME") {
            self.qdrant.collection_name = v;
        }

        if let Some(v) = get("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(v) = get("TURSO_AUTH_TOKEN") {
            self.database.auth_token = Some(v);
        }

        if let Some(v) = get("UPLOADS_DIR") {
            self.documents.uploads_dir = PathBuf::from(v);
        }
        if let Some(v) = get("PROMPTS_DIR") {
            self.agent.prompts_dir = PathBuf::from(v);
        }
        if let Some(v) = get("RELEVANCE_THRESHOLD") {
            self.agent.relevance_threshold = parse_env("RELEVANCE_THRESHOLD", &v)?;
        }

        Ok(())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.access_token_expire_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.access_token_expire_minutes must be positive".to_string(),
            ));
        }

        if self.documents.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "documents.chunk_size must be greater than zero".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.agent.relevance_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "agent.relevance_threshold must be within [0, 1], got {}",
                self.agent.relevance_threshold
            )));
        }

        if self.agent.max_cv_chunks > self.agent.max_context_chunks {
            return Err(ConfigError::ValidationError(
                "agent.max_cv_chunks cannot exceed agent.max_context_chunks".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue {
            name: name.to_string(),
            value: value.to_string(),
        })
}

// ============= Hot Reloading Configuration Manager =============

/// Callback run with the new configuration after every successful reload.
pub type ReloadHook = Box<dyn Fn(&GemeloConfig) + Send + Sync>;

/// Thread-safe configuration manager with hot reloading support
pub struct GemeloConfigManager {
    config: Arc<ArcSwap<GemeloConfig>>,
    config_path: PathBuf,
    watcher: RwLock<Option<RecommendedWatcher>>,
    hooks: Arc<RwLock<Vec<ReloadHook>>>,
}

impl GemeloConfigManager {
    /// Create a new configuration manager and load the initial config
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        // Absolute path for reliable file watching
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(ConfigError::ReadError)?
                .join(path)
        };

        let config = GemeloConfig::load(&path)?;

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: path,
            watcher: RwLock::new(None),
            hooks: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Create a config manager directly from a config (useful for testing).
    /// This won't have file watching capabilities.
    pub fn from_config(config: GemeloConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            config_path: PathBuf::from("test-config.toml"),
            watcher: RwLock::new(None),
            hooks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Get the current configuration (lockless read)
    pub fn config(&self) -> Arc<GemeloConfig> {
        self.config.load_full()
    }

    /// Registers a callback for reloaded configurations
    pub fn on_reload<F>(&self, hook: F)
    where
        F: Fn(&GemeloConfig) + Send + Sync + 'static,
    {
        self.hooks.write().push(Box::new(hook));
    }

    /// Manually reload the configuration from disk
    pub fn reload(&self) -> Result<(), ConfigError> {
        info!("Reloading configuration from {:?}", self.config_path);

        let new_config = GemeloConfig::load(&self.config_path)?;
        publish(&self.config, &self.hooks, new_config);

        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Start watching for configuration file changes
    pub fn start_watching(&self) -> Result<(), ConfigError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let config_path = self.config_path.clone();
        let config_arc = Arc::clone(&self.config);
        let hooks = Arc::clone(&self.hooks);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => {
                    error!("Config watcher error: {:?}", e);
                }
            }
        })?;

        // Watch the parent directory so editors that replace the file are seen
        if let Some(parent) = self.config_path.parent() {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }

        *self.watcher.write() = Some(watcher);

        tokio::spawn(async move {
            let mut last_reload = std::time::Instant::now();
            let debounce_duration = Duration::from_millis(500);

            while rx.recv().await.is_some() {
                if last_reload.elapsed() < debounce_duration {
                    continue;
                }

                // Let the writer finish
                tokio::time::sleep(Duration::from_millis(100)).await;

                match GemeloConfig::load(&config_path) {
                    Ok(new_config) => {
                        publish(&config_arc, &hooks, new_config);
                        info!("Configuration hot-reloaded successfully");
                        last_reload = std::time::Instant::now();
                    }
                    Err(e) => {
                        warn!(
                            "Failed to hot-reload config: {}. Keeping previous config.",
                            e
                        );
                    }
                }
            }
        });

        info!("Configuration hot-reload watcher started");
        Ok(())
    }

    /// Stop watching for configuration changes
    pub fn stop_watching(&self) {
        *self.watcher.write() = None;
        info!("Configuration hot-reload watcher stopped");
    }
}

fn publish(
    config: &ArcSwap<GemeloConfig>,
    hooks: &RwLock<Vec<ReloadHook>>,
    new_config: GemeloConfig,
) {
    let new_config = Arc::new(new_config);
    config.store(Arc::clone(&new_config));

    for hook in hooks.read().iter() {
        hook(&new_config);
    }
}
