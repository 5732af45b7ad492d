use tracing::info;

use super::{ControlError, WarehouseControlPlane};

impl WarehouseControlPlane {
    /// Runs a read-only query and renders the rows as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ControlError::Store` if the query fails or times out.
    pub async fn run_query(&self, sql: &str) -> Result<String, ControlError> {
        let rows = self.store.run_query(sql).await?;
        info!(rows = rows.len(), "query returned rows");
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}
