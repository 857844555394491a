use anyhow::{Context, Result};
use gemelo::{
    AppState, ChatHistoryStore, GemeloConfig, GemeloConfigManager,
    api::create_router,
    cli::{Cli, Commands, check_env, init_data, output::Output, show_metadata},
    db::QdrantStore,
    llm::openai::OpenAIClient,
    rag::embeddings::OpenAIEmbedder,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = cli.output();

    if let Some(Commands::CheckEnv) = cli.command {
        std::process::exit(check_env::run(&output));
    }

    let config_manager = Arc::new(
        GemeloConfigManager::new(&cli.config)
            .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?,
    );
    let config = config_manager.config();
    init_tracing(&config);

    match cli.command {
        None | Some(Commands::Serve) => serve(config_manager, &output).await,
        Some(Commands::InitData { document }) => {
            let document = document.unwrap_or_else(|| config.documents.seed_document.clone());
            run_init_data(config_manager, &document, &output).await
        }
        Some(Commands::ShowMetadata) => {
            let store = vector_store(&config)?;
            show_metadata::run(store.as_ref(), &output).await?;
            Ok(())
        }
        Some(Commands::CheckEnv) => Ok(()),
    }
}

fn init_tracing(config: &GemeloConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gemelo={0},gemelo_server={0},tower_http={0}",
            config.server.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.server.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn vector_store(config: &GemeloConfig) -> Result<Arc<QdrantStore>> {
    let endpoint = config.qdrant.endpoint();
    info!("Connecting to Qdrant at {}", endpoint.url);
    let store = QdrantStore::new(
        &endpoint.url,
        endpoint.api_key,
        config.qdrant.collection_name.clone(),
        config.openai.embedding_dimensions,
    )
    .context("Failed to create Qdrant client")?;
    Ok(Arc::new(store))
}

async fn app_state(config_manager: Arc<GemeloConfigManager>) -> Result<AppState> {
    let config = config_manager.config();

    let api_key = config
        .openai
        .api_key
        .clone()
        .context("OPENAI_API_KEY is not set")?;

    let llm = Arc::new(OpenAIClient::new(
        api_key.clone(),
        config.openai.api_base.clone(),
        config.openai.model.clone(),
    ));
    let embedder = Arc::new(
        OpenAIEmbedder::new(
            api_key,
            config.openai.api_base.clone(),
            config.openai.embedding_model.clone(),
            config.openai.embedding_dimensions,
        )
        .with_retry(
            config.openai.embedding_max_retries,
            Duration::from_secs(config.openai.embedding_retry_delay_secs),
        ),
    );
    let store = vector_store(&config)?;
    let history = Arc::new(
        ChatHistoryStore::connect(&config.database.url, config.database.auth_token.clone())
            .await
            .context("Failed to open chat history database")?,
    );

    Ok(AppState::new(config_manager, llm, embedder, store, history))
}

async fn serve(config_manager: Arc<GemeloConfigManager>, output: &Output) -> Result<()> {
    output.banner(&config_manager.config().agent.persona_name);

    let state = app_state(Arc::clone(&config_manager)).await?;

    if let Err(e) = state.vector_store.initialize_collection().await {
        warn!("Vector store not ready at startup: {}", e);
    }

    if let Err(e) = config_manager.start_watching() {
        warn!("Configuration hot reload disabled: {}", e);
    }

    let config = config_manager.config();
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    info!(
        model = %state.agent.model_name(),
        collection = %state.vector_store.collection_name(),
        "Starting Gemelo server"
    );

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", addr);
    output.ok(&format!("Server running on http://{addr}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    config_manager.stop_watching();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

async fn run_init_data(
    config_manager: Arc<GemeloConfigManager>,
    document: &str,
    output: &Output,
) -> Result<()> {
    let state = app_state(config_manager).await?;

    output.stage(1, 2, "Waiting for the vector store");
    let outcome = init_data::init_data(
        state.vector_store.as_ref(),
        &state.ingest,
        document,
        init_data::MAX_ATTEMPTS,
        init_data::RETRY_DELAY,
    )
    .await?;

    output.stage(2, 2, "Checking the seed document");
    match outcome {
        init_data::InitOutcome::StoreUnavailable => {
            output.fail("The vector store is not available after several attempts")
        }
        init_data::InitOutcome::FileMissing(path) => {
            output.warn(&format!("{} does not exist", path.display()))
        }
        init_data::InitOutcome::AlreadyIndexed { chunks } => output.ok(&format!(
            "{document} is already indexed ({chunks} chunks)"
        )),
        init_data::InitOutcome::Ingested { chunks } => {
            output.finished(&format!("{document} indexed with {chunks} chunks"))
        }
    }
    Ok(())
}
