use tracing_subscriber::EnvFilter;

use rag_chat::api;
use rag_chat::config::Config;
use rag_chat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);
    if config.admin.is_none() {
        tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD_HASH not set; admin routes disabled");
    }

    let bind_addr = config.bind_addr.clone();
    let state = tokio::task::spawn_blocking(move || AppState::new(config)).await??;
    tracing::info!(
        "Knowledge base ready: {} documents, {} vector rows",
        state.engine.document_count(),
        state.engine.vector_rows()
    );

    // No CORS layer: the chat page is served from the same origin.
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {bind_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
