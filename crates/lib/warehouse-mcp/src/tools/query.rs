use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use warehouse_core::control::ControlError;
use warehouse_core::store::StoreError;

use crate::{WarehouseMcp, helpers};

/// Parameters for running SQL against the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RunQueryParams {
    /// A single read-only SQL statement.
    pub query: String,
}

#[tool_router(router = tool_router_query, vis = "pub")]
impl WarehouseMcp {
    #[tool(description = "Runs a read-only SQL query on the Postgres warehouse and returns the rows as JSON. \
Use this tool when you need to access data or list notebook entries. Call get_tables first and use the exact \
table and column names it shows: do not drop \"$raw\" from table names or \"$\" from field names. \
People who took an action are usually in the principal table; notebook entries are in the entry table.")]
    async fn run_query(
        &self,
        Parameters(params): Parameters<RunQueryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        Ok(match self.control.run_query(&params.query).await {
            Ok(rows) => helpers::text_result(rows),
            Err(ControlError::Store(StoreError::Database(err))) => {
                helpers::error_result("run_query", format!("Database error: {err}"))
            }
            Err(err) => helpers::error_result("run_query", format!("Error executing query: {err}")),
        })
    }
}
