use mcq_generator::{
    build_router,
    config::{get_config, init_config},
    middleware::cors::permissive_cors,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();
    init_config()?;
    let config = get_config();

    let app_state = AppState::new().await?;
    info!(
        ollama_host = %config.ollama_host,
        ollama_model = %config.ollama_model,
        strict_via_openai = config.openai_api_key.is_some(),
        "model services configured"
    );

    let app = build_router(app_state, config.generation_rps)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
