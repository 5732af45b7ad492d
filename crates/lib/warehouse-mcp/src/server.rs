//! stdio and streamable HTTP runners for the warehouse tools.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tracing::info;
use warehouse_core::control::WarehouseControlPlane;

use crate::WarehouseMcp;

const DEFAULT_SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);
const DEFAULT_SSE_RETRY: Duration = Duration::from_secs(3);

/// Listener address and session behaviour for the HTTP transport.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    /// Keep one MCP session per client instead of answering each POST alone.
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(DEFAULT_SSE_KEEP_ALIVE),
            sse_retry: Some(DEFAULT_SSE_RETRY),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    /// `None` turns SSE keep-alive pings off.
    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }

    fn session_config(&self) -> StreamableHttpServerConfig {
        StreamableHttpServerConfig {
            sse_keep_alive: self.sse_keep_alive,
            sse_retry: self.sse_retry,
            stateful_mode: self.stateful_mode,
            ..Default::default()
        }
    }
}

/// Serves the warehouse tools over stdin/stdout until the client disconnects.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    control: WarehouseControlPlane,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("serving MCP over stdio");
    let running = serve_server(WarehouseMcp::new(control), stdio()).await?;
    running.waiting().await?;
    Ok(())
}

/// Serves `/mcp` over streamable HTTP, with a plain `/health` route beside it.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    control: WarehouseControlPlane,
    config: McpHttpServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = http_router(control, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(
        addr = %config.addr,
        stateful = config.stateful_mode,
        "serving MCP over streamable HTTP"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

fn http_router(control: WarehouseControlPlane, config: &McpHttpServerConfig) -> Router {
    let mcp: StreamableHttpService<WarehouseMcp, LocalSessionManager> = StreamableHttpService::new(
        move || Ok(WarehouseMcp::new(control.clone())),
        Arc::new(LocalSessionManager::default()),
        config.session_config(),
    );
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", mcp)
}
