use clap::{Parser, builder::BoolishValueParser};
use std::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use warehouse_core::clients::normalize_api_base_url;
use warehouse_core::control::{DEFAULT_MAX_RESPONSE_LENGTH, RESPONSE_MARGIN};
use warehouse_core::store::WarehouseStoreConfig;
use warehouse_mcp::server::McpHttpServerConfig;

const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SSE_KEEP_ALIVE_SECS: u64 = 15;
const MIN_RESPONSE_LENGTH: usize = RESPONSE_MARGIN * 2;
const REQUIRED_SSL_MODE: &str = "sslmode=verify-ca";

#[derive(Parser, Debug)]
#[command(
    name = "warehouse-mcpd",
    version,
    about = "MCP server for a read-only lab data warehouse and PubMed literature search."
)]
struct CliArgs {
    /// Postgres connection string for the warehouse, e.g.
    /// postgres://<user>:<password>@<host>:5432/warehouse?sslmode=verify-ca
    #[arg(
        long,
        short = 'w',
        env = "BENCHLING_WAREHOUSE_CONNECTION",
        hide_env_values = true
    )]
    warehouse_connection: Option<String>,

    /// Organization id; also the warehouse schema holding its tables.
    #[arg(long, short = 'o', env = "BENCHLING_ORGANIZATION_ID")]
    organization_id: Option<String>,

    #[arg(long, env = "BENCHLING_API_KEY", hide_env_values = true)]
    benchling_api_key: Option<String>,

    /// Notebook API base URL; `/api/v2` is appended when missing.
    #[arg(long, env = "BENCHLING_API_BASE_URL")]
    benchling_base_url: Option<String>,

    /// Register the PubMed literature tools.
    #[arg(
        long,
        env = "ENABLE_LITERATURE_SEARCH",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_literature_search: bool,

    #[arg(
        long,
        env = "WAREHOUSE_MAX_RESPONSE_LENGTH",
        default_value_t = DEFAULT_MAX_RESPONSE_LENGTH
    )]
    max_response_length: usize,

    #[arg(
        long,
        env = "WAREHOUSE_QUERY_TIMEOUT_SECS",
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS
    )]
    query_timeout_secs: u64,

    #[arg(
        long,
        env = "WAREHOUSE_MAX_CONNECTIONS",
        default_value_t = DEFAULT_MAX_CONNECTIONS
    )]
    max_connections: u32,

    #[arg(
        long,
        env = "WAREHOUSE_CONNECT_TIMEOUT_SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS
    )]
    connect_timeout_secs: u64,

    /// Serve streamable HTTP on this address instead of stdio.
    #[arg(long, env = "WAREHOUSE_MCP_HTTP_ADDR")]
    mcp_http_addr: Option<SocketAddr>,

    /// Answer each HTTP request on its own instead of keeping MCP sessions.
    #[arg(
        long,
        env = "WAREHOUSE_MCP_HTTP_STATELESS",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    mcp_http_stateless: bool,

    /// Seconds between SSE keep-alive pings; 0 disables them.
    #[arg(
        long,
        env = "WAREHOUSE_MCP_SSE_KEEP_ALIVE_SECS",
        default_value_t = DEFAULT_SSE_KEEP_ALIVE_SECS
    )]
    mcp_sse_keep_alive_secs: u64,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Clone)]
pub struct WarehouseConfig {
    pub warehouse_connection: String,
    pub organization_id: String,
    pub benchling_api_key: String,
    pub benchling_base_url: String,
    pub enable_literature_search: bool,
    pub max_response_length: usize,
    pub query_timeout: Duration,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub mcp_http_addr: Option<SocketAddr>,
    pub mcp_http_stateless: bool,
    pub mcp_sse_keep_alive: Option<Duration>,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingSetting(&'static str),
    InvalidSetting { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSetting(name) => write!(f, "missing required setting: {name}"),
            Self::InvalidSetting { name, value } => {
                write!(f, "invalid {name} value: {value}")
            }
        }
    }
}

impl Error for ConfigError {}

impl WarehouseConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::try_from(args)
    }

    pub fn store_config(&self) -> WarehouseStoreConfig {
        WarehouseStoreConfig::new(&self.warehouse_connection, &self.organization_id)
            .with_max_connections(self.max_connections)
            .with_connect_timeout(self.connect_timeout)
            .with_query_timeout(self.query_timeout)
    }

    /// HTTP transport settings, when an HTTP address is configured.
    pub fn http_config(&self) -> Option<McpHttpServerConfig> {
        self.mcp_http_addr.map(|addr| {
            McpHttpServerConfig::new(addr)
                .with_stateful_mode(!self.mcp_http_stateless)
                .with_sse_keep_alive(self.mcp_sse_keep_alive)
        })
    }
}

impl TryFrom<CliArgs> for WarehouseConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let warehouse_connection = required(
            args.warehouse_connection,
            "BENCHLING_WAREHOUSE_CONNECTION",
        )?;
        if !is_valid_connection_string(&warehouse_connection) {
            return Err(ConfigError::InvalidSetting {
                name: "BENCHLING_WAREHOUSE_CONNECTION",
                value: format!(
                    "{} (must start with postgres:// or postgresql:// and include {REQUIRED_SSL_MODE})",
                    redact_credentials(&warehouse_connection)
                ),
            });
        }

        let organization_id = required(args.organization_id, "BENCHLING_ORGANIZATION_ID")?;
        let benchling_api_key = required(args.benchling_api_key, "BENCHLING_API_KEY")?;
        let benchling_base_url = required(args.benchling_base_url, "BENCHLING_API_BASE_URL")?;
        let is_http = benchling_base_url.starts_with("https://")
            || benchling_base_url.starts_with("http://");
        if !is_http {
            return Err(ConfigError::InvalidSetting {
                name: "BENCHLING_API_BASE_URL",
                value: benchling_base_url,
            });
        }

        if args.max_response_length < MIN_RESPONSE_LENGTH {
            return Err(ConfigError::InvalidSetting {
                name: "WAREHOUSE_MAX_RESPONSE_LENGTH",
                value: args.max_response_length.to_string(),
            });
        }
        if args.query_timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "WAREHOUSE_QUERY_TIMEOUT_SECS",
                value: args.query_timeout_secs.to_string(),
            });
        }
        if args.max_connections == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "WAREHOUSE_MAX_CONNECTIONS",
                value: args.max_connections.to_string(),
            });
        }

        Ok(Self {
            warehouse_connection,
            organization_id,
            benchling_api_key,
            benchling_base_url: normalize_api_base_url(&benchling_base_url),
            enable_literature_search: args.enable_literature_search,
            max_response_length: args.max_response_length,
            query_timeout: Duration::from_secs(args.query_timeout_secs),
            max_connections: args.max_connections,
            connect_timeout: Duration::from_secs(args.connect_timeout_secs),
            mcp_http_addr: args.mcp_http_addr,
            mcp_http_stateless: args.mcp_http_stateless,
            mcp_sse_keep_alive: (args.mcp_sse_keep_alive_secs > 0)
                .then(|| Duration::from_secs(args.mcp_sse_keep_alive_secs)),
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingSetting(name))
}

fn is_valid_connection_string(connection: &str) -> bool {
    (connection.starts_with("postgres://") || connection.starts_with("postgresql://"))
        && connection.contains(REQUIRED_SSL_MODE)
}

/// Replaces the user-info part of a URL so errors never echo a password.
fn redact_credentials(connection: &str) -> String {
    let Some((scheme, rest)) = connection.split_once("://") else {
        return "<unparseable connection string>".to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => connection.to_string(),
    }
}
