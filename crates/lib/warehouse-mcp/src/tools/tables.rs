use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{WarehouseMcp, helpers};

/// Parameters for listing warehouse tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetTablesParams {
    /// Index of the first table to describe. Defaults to 0.
    pub start_index: Option<usize>,
}

#[tool_router(router = tool_router_tables, vis = "pub")]
impl WarehouseMcp {
    #[tool(description = "Lists all tables in the warehouse with their columns, types, sample values and relationships. \
Use this tool when you need to understand the schema of the warehouse to help you construct a query. \
The response is paginated by size; pass start_index to continue after the last index returned. \
All id columns are varchar unless otherwise specified. Only non-obvious relationships are listed.")]
    async fn get_tables(
        &self,
        Parameters(params): Parameters<GetTablesParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let start_index = params.start_index.unwrap_or(0);
        info!(start_index, "listing tables");
        Ok(helpers::text_result(self.control.list_tables(start_index)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn first_page_by_default() {
        let server = WarehouseMcp::new(test_support::control_plane(false));
        let result = server
            .get_tables(Parameters(GetTablesParams::default()))
            .await
            .expect("tables");
        assert_ne!(result.is_error, Some(true));
        let text = helpers::result_text(&result);
        assert!(text.starts_with("The available tables (indices 0 to 0 out of 1) are:"));
        assert!(text.contains("acme.entry$raw"));
    }

    #[tokio::test]
    async fn past_the_end_is_not_an_error() {
        let server = WarehouseMcp::new(test_support::control_plane(false));
        let result = server
            .get_tables(Parameters(GetTablesParams {
                start_index: Some(10),
            }))
            .await
            .expect("tables");
        assert_ne!(result.is_error, Some(true));
        assert_eq!(
            helpers::result_text(&result),
            "No tables available from index 10 (out of 1)."
        );
    }
}
