//! Daemon entry point for the warehouse MCP server.
//!
//! Loads configuration from flags and the environment, connects to the
//! warehouse, builds the table overview once, and serves the MCP protocol over
//! stdio or streamable HTTP.

mod config;

use tracing::info;
use tracing_subscriber::EnvFilter;
use warehouse_core::clients::{EntriesClient, PubMedClient};
use warehouse_core::control::WarehouseControlPlane;
use warehouse_core::store::WarehouseStore;
use warehouse_mcp::server::{serve_stdio, serve_streamable_http};

use crate::config::WarehouseConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // stdout carries the stdio transport
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WarehouseConfig::from_args()?;
    let store = WarehouseStore::connect(&config.store_config()).await?;
    let overview = store.load_overview().await?;
    info!(tables = overview.len(), "warehouse overview ready");

    let entries = EntriesClient::new(&config.benchling_base_url, config.benchling_api_key.clone())?;
    let mut control = WarehouseControlPlane::new(store, overview, entries)
        .with_max_response_length(config.max_response_length);
    if config.enable_literature_search {
        info!("literature search enabled");
        control = control.with_literature(PubMedClient::new()?);
    }

    match config.http_config() {
        Some(http) => serve_streamable_http(control, http).await,
        None => serve_stdio(control).await,
    }
}
