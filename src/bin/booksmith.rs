use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use booksmith::book::{BookState, QwenClient};
use booksmith::config::AppConfig;
use booksmith::middleware::{AuthConfig, MemorySessionStore};
use booksmith::views::Views;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before logging so `.env` can set RUST_LOG.
    let env_file = booksmith::config::load_env_file();
    booksmith::logging::init();
    match env_file {
        Ok(Some(path)) => tracing::debug!(path = %path.display(), "Loaded .env"),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }

    let config = AppConfig::from_env().context("failed to load configuration")?;
    let auth = AuthConfig::from_env().context("failed to load login configuration")?;

    let mut qwen = QwenClient::new();
    if let Some(base_url) = &config.qwen_base_url {
        qwen = qwen.with_base_url(base_url.clone());
    }
    if let Some(model) = &config.qwen_model {
        qwen = qwen.with_model(model.clone());
    }
    qwen.endpoint().context("QWEN_BASE_URL is not a valid URL")?;
    if config.qwen_api_key.is_none() {
        tracing::warn!("QWEN_API_KEY not set; requests must supply their own api_key");
    }

    let sessions = Arc::new(MemorySessionStore::new().with_ttl(auth.session_ttl()));
    let views = Arc::new(Views::new().context("failed to compile templates")?);
    let book = BookState::new(qwen, config.qwen_api_key.clone());

    let app = booksmith::app::router(auth, sessions, views, book);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
