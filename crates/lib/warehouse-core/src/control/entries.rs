use tracing::info;

use super::{ControlError, WarehouseControlPlane};

impl WarehouseControlPlane {
    /// Fetches notebook entries and renders them as a pretty-printed JSON array.
    ///
    /// # Errors
    /// Returns `ControlError::Entries` if the ids are invalid or the API call fails.
    pub async fn get_notebook_entries(&self, entry_ids: &[String]) -> Result<String, ControlError> {
        info!(ids = ?entry_ids, "retrieving notebook entries");
        let entries = self.entries.get_entries(entry_ids).await?;
        Ok(serde_json::to_string_pretty(&entries)?)
    }
}
