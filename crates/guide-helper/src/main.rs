mod account;
mod authoring;
mod bootstrap;
mod catalog;
mod config;
mod error;
mod favorites;
mod seed;
mod server;
mod state;
mod steps;
mod store;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use guide_common::api::{ApiClient, ApiClientConfig};
use guide_common::session::SessionStore;
use guide_common::storage::FileStore;
use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use favorites::FavoritesSync;
use server::GuideHelperServer;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting guide-helper MCP server");

    let config = Config::from_env()?;
    let api_config = ApiClientConfig::from_env();
    info!(
        data_dir = %config.data_dir.display(),
        api_base_url = %api_config.base_url,
        cache_capacity = config.cache_capacity,
        signed_in = config.initial_session.is_some(),
        "configuration loaded"
    );

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let ready = bootstrap::initialize(
        Arc::new(FileStore::new(&config.data_dir)),
        &config,
        seed::BUNDLED_SEEDS,
    )
    .await?;
    info!(
        updated = ready.seeds.updated.len(),
        failed = ready.seeds.failed.len(),
        "local guides ready"
    );

    let sessions = Arc::new(SessionStore::new(config.initial_session.clone()));
    let api = Arc::new(ApiClient::new(api_config, Arc::clone(&sessions))?);
    let state = Arc::new(AppState::new(&config.language, &config.device_family, sessions));

    let favorites = FavoritesSync::new(
        Arc::clone(&state),
        api.clone(),
        config.favorites_sync_delay,
    );
    let _observer = favorites.observe();

    let server = GuideHelperServer::new(
        &config,
        state,
        ready.store,
        api.clone(),
        api,
        favorites,
    );

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
