//! artisan-sw server entry point.
//!
//! Boots the caching worker against the configured store and origin, then
//! serves the MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, Registration, StaticCapabilities, WorkerSettings};
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

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation_tag(),
        origin = %config.origin,
        db_path = %config.db_path.display(),
        "Starting artisan-sw server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let registration = Arc::new(Registration::new(db, network, Arc::new(StaticCapabilities::none())));

    let settings = WorkerSettings::from_config(&config)?;
    match registration.register(settings).await {
        Ok(report) => tracing::info!(
            generation = %report.generation,
            entries = report.entries,
            state = %report.state,
            "worker registered"
        ),
        Err(e) => tracing::warn!(error = %e, "initial install failed; retry with sw_install"),
    }

    let handler = handler::SwCacheServer::new(registration, Arc::new(config));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
