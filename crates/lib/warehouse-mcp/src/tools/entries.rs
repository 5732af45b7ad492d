use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};

use crate::{WarehouseMcp, helpers};

/// Parameters for fetching notebook entries.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetNotebookEntryParams {
    /// Notebook entry ids, each starting with `etr_`.
    pub entry_ids: Vec<String>,
}

#[tool_router(router = tool_router_entries, vis = "pub")]
impl WarehouseMcp {
    #[tool(description = "Retrieve the full JSON object for one or more notebook entries by entry id (ids start with etr_). \
Use this tool when you need the data within a notebook entry. If you don't have the ids, find entries with \
get_tables and run_query first.")]
    async fn get_notebook_entry_by_id(
        &self,
        Parameters(params): Parameters<GetNotebookEntryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(match self.control.get_notebook_entries(&params.entry_ids).await {
            Ok(entries) => helpers::text_result(entries),
            Err(err) => helpers::error_result(
                "get_notebook_entry_by_id",
                format!("Error retrieving notebook entries: {err}"),
            ),
        })
    }
}
