//! MCP tool modules.
//!
//! Tools are grouped by what they touch: the schema overview, the query
//! runner, the notebook entries API and the literature search.

pub mod entries;
pub mod literature;
pub mod query;
pub mod tables;

pub use entries::GetNotebookEntryParams;
pub use literature::{DateRangeParams, GetPubmedFulltextParams, ListPubmedPapersParams};
pub use query::RunQueryParams;
pub use tables::GetTablesParams;
