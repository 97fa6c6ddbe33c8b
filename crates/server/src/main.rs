//! top10-offline server entry point.
//!
//! Boots the offline shell worker (install, activate, claim) and serves the
//! MCP tools on stdio transport. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use top10_client::{FetchClient, FetchConfig, RoutePolicy, ShellManifest, ShellWorker};
use top10_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(origin = %config.origin, cache_name = %config.cache_name, "Starting top10-offline server on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", config.db_path.display()))?;
    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let manifest = ShellManifest::from_config(&config)?;

    let worker = ShellWorker::new(
        manifest,
        RoutePolicy::new(config.data_path_pattern.clone()),
        Arc::new(db),
        Arc::new(fetcher),
    )
    .with_skip_waiting(config.skip_waiting);

    match worker.start().await {
        Ok(outcome) => tracing::info!(?outcome, "offline shell ready"),
        Err(e) => tracing::error!(error = %e, "offline shell not installed; tools report NOT_CONTROLLED until shell_update succeeds"),
    }

    let handler = handler::OfflineShellServer::new(Arc::new(worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
