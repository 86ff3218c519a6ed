//! Memoria HTTP server entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tokio::signal;

use memoria::cache::ResultCache;
use memoria::config::Config;
use memoria::coordinator::Coordinator;
use memoria::embedding::{Gateway as EmbeddingGateway, HttpEmbeddingProvider, TokenBucket};
use memoria::gateway::{HandlerState, create_router_with_state};
use memoria::index::InMemoryVectorIndex;
use memoria::store::SqliteMemoryStore;
use memoria::topics::LlmSummarizer;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "--health-check") {
        std::process::exit(run_health_check());
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    config.validate()?;
    let addr: SocketAddr = config.socket_addr().parse()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        "memoria starting"
    );

    std::fs::create_dir_all(&config.storage_path)?;
    let store = Arc::new(SqliteMemoryStore::open(&config.database_path())?);

    let provider = Arc::new(HttpEmbeddingProvider::new(
        config.embedding_endpoint.clone(),
        config.embedding_api_key.clone(),
        "default".to_string(),
        config.embedding_dim,
    ));
    let bucket = Arc::new(TokenBucket::new(
        config.embedding_rate_per_sec,
        config.embedding_reserved_fraction,
    ));
    let embeddings = Arc::new(EmbeddingGateway::new(provider, bucket));

    let index = Arc::new(InMemoryVectorIndex::with_capacity(config.hot_cache_capacity));
    let cache = Arc::new(ResultCache::with_hot_capacity(
        store.clone(),
        config.hot_cache_capacity,
    ));

    let mut coordinator = Coordinator::new(store.clone(), embeddings, index, cache);
    if let Some(llm_endpoint) = &config.llm_endpoint {
        tracing::info!(endpoint = %llm_endpoint, "label summarization enabled");
        let summarizer = Arc::new(LlmSummarizer::new(
            llm_endpoint.clone(),
            config.embedding_api_key.clone(),
            "default".to_string(),
        ));
        coordinator = coordinator.with_summarizer(summarizer);
    } else {
        tracing::info!("no MEMORIA_LLM_ENDPOINT configured, labels are keyword-derived only");
    }

    let state = HandlerState::new(Arc::new(coordinator), config.storage_path.clone());
    let app = create_router_with_state(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("memoria shutdown complete");
    Ok(())
}

fn run_health_check() -> i32 {
    let port = std::env::var("MEMORIA_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let url = format!("http://127.0.0.1:{}/healthz", port);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build runtime");

    rt.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .expect("failed to build client");

        match client.get(&url).send().await {
            Ok(res) if res.status().is_success() => 0,
            _ => 1,
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
