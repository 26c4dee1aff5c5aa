#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod auth;
mod config;
mod gateway;

use api::state::AppContext;
use config::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,agentgate_server=debug,agentgate_exec=debug".into()
            }),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    let config = ServerConfig::load()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        auth = ?config.auth,
        "Starting agentgate server"
    );

    if config.auth.api_key().is_none() {
        tracing::info!("No API key configured; API-key routes will deny every request");
    }
    if config.auth.basic_credentials().is_none() {
        tracing::warn!(
            "Basic auth disabled; set AGENTGATE_AUTH_LOGIN and AGENTGATE_AUTH_PASSWORD before exposing this server"
        );
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppContext::new(config));
    let app = gateway::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|err| anyhow::anyhow!("Failed to bind to {}: {}", addr, err))?;

    tracing::info!("agentgate running on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("agentgate shutting down");
}
