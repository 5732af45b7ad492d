use std::{error::Error, fmt, time::Duration};

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use tracing::{debug, info};
use warehouse_store::schema::quote_identifier;

use super::rows::{QueryRows, row_to_json};

#[derive(Debug)]
pub enum StoreError {
    Database(Box<sqlx::Error>),
    InvalidInput(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Database(err) => write!(f, "{err}"),
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Database(err) => Some(err.as_ref()),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Connection settings for the warehouse pool.
#[derive(Debug, Clone)]
pub struct WarehouseStoreConfig {
    pub url: String,
    pub org_prefix: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub connect_timeout: Duration,
    pub query_timeout: Duration,
}

impl WarehouseStoreConfig {
    pub fn new(url: impl Into<String>, org_prefix: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            org_prefix: org_prefix.into(),
            min_connections: 1,
            max_connections: 20,
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    #[must_use]
    pub const fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    fn pool_options(&self) -> PgPoolOptions {
        let search_path = format!("SET search_path = {}", quote_identifier(&self.org_prefix));
        PgPoolOptions::new()
            .min_connections(self.min_connections.min(self.max_connections))
            .max_connections(self.max_connections)
            .acquire_timeout(self.connect_timeout)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute("SET default_transaction_read_only = on").await?;
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
    }
}

/// Pooled, read-only handle on one tenant's warehouse schema.
#[derive(Clone)]
pub struct WarehouseStore {
    pool: PgPool,
    org_prefix: String,
    query_timeout: Duration,
}

impl WarehouseStore {
    /// Opens the pool and verifies that a session can be established.
    ///
    /// # Errors
    /// Returns `StoreError` if the URL is invalid or no connection can be made.
    pub async fn connect(config: &WarehouseStoreConfig) -> StoreResult<Self> {
        ensure_org_prefix(&config.org_prefix)?;
        info!(org = %config.org_prefix, "connecting to warehouse");
        let pool = config.pool_options().connect(&config.url).await?;
        let store = Self::from_pool(pool, config);
        store.ping().await?;
        info!("connected to warehouse");
        Ok(store)
    }

    /// Builds the pool without opening any connection until first use.
    ///
    /// # Errors
    /// Returns `StoreError` if the URL cannot be parsed.
    pub fn connect_lazy(config: &WarehouseStoreConfig) -> StoreResult<Self> {
        ensure_org_prefix(&config.org_prefix)?;
        let pool = config.pool_options().connect_lazy(&config.url)?;
        Ok(Self::from_pool(pool, config))
    }

    fn from_pool(pool: PgPool, config: &WarehouseStoreConfig) -> Self {
        Self {
            pool,
            org_prefix: config.org_prefix.clone(),
            query_timeout: config.query_timeout,
        }
    }

    #[must_use]
    pub fn org_prefix(&self) -> &str {
        &self.org_prefix
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs `SELECT 1` on a pooled session.
    ///
    /// # Errors
    /// Returns `StoreError` if the warehouse cannot be reached.
    pub async fn ping(&self) -> StoreResult<()> {
        let _: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Runs one read-only statement under the configured statement timeout.
    ///
    /// # Errors
    /// Returns `StoreError` if the query is empty, fails, times out, or returns
    /// a value that cannot be decoded.
    pub async fn run_query(&self, sql: &str) -> StoreResult<QueryRows> {
        if sql.trim().is_empty() {
            return Err(StoreError::InvalidInput("query is required".to_string()));
        }

        let timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.query_timeout.as_millis()
        );
        let mut tx = self.pool.begin().await?;
        let conn: &mut sqlx::PgConnection = &mut tx;
        conn.execute(timeout.as_str()).await?;
        let rows = sqlx::query(sql)
            .persistent(false)
            .fetch_all(&mut *conn)
            .await
            .map_err(statement_error)?;
        tx.rollback().await?;

        debug!(rows = rows.len(), "query finished");
        rows.iter().map(row_to_json).collect()
    }
}

/// The extended query protocol rejects several statements in one query.
fn statement_error(err: sqlx::Error) -> StoreError {
    let multiple = err
        .as_database_error()
        .is_some_and(|db| is_multiple_statements_message(db.message()));
    if multiple {
        return StoreError::InvalidInput(
            "only a single SQL statement can be run at a time; send each statement separately"
                .to_string(),
        );
    }
    err.into()
}

fn is_multiple_statements_message(message: &str) -> bool {
    message.contains("cannot insert multiple commands into a prepared statement")
}

fn ensure_org_prefix(org_prefix: &str) -> StoreResult<()> {
    if org_prefix.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "organization id is required".to_string(),
        ));
    }
    Ok(())
}
