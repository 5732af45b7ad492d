use rmcp::{
    ErrorData,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars,
    tool,
    tool_router,
};
use serde::{Deserialize, Serialize};
use warehouse_core::clients::{DateRange, LiteratureError, PaperSearch};
use warehouse_core::control::ControlError;

use crate::{WarehouseMcp, helpers};

/// Publication date bounds, as `YYYY-MM-DD` dates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DateRangeParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Parameters for a `PubMed` search.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListPubmedPapersParams {
    /// `PubMed` search term.
    pub query: String,
    /// Number of papers to return, 1 to 100. Defaults to 10.
    pub max_results: Option<i64>,
    pub date_range: Option<DateRangeParams>,
    /// `relevance` (default) or `date`.
    pub sort_by: Option<String>,
    /// Publication type such as `review` or `clinical trial`.
    pub article_type: Option<String>,
    pub journal: Option<String>,
}

impl ListPubmedPapersParams {
    fn into_search(self) -> Result<PaperSearch, LiteratureError> {
        let mut search = PaperSearch::new(self.query);
        if let Some(max_results) = self.max_results {
            search = search.with_max_results(max_results);
        }
        if let Some(range) = self.date_range {
            let range = DateRange::parse(range.start.as_deref(), range.end.as_deref())?;
            if !range.is_empty() {
                search = search.with_date_range(range);
            }
        }
        if let Some(sort_by) = self.sort_by {
            search = search.with_sort_by(sort_by);
        }
        if let Some(article_type) = self.article_type {
            search = search.with_article_type(article_type);
        }
        if let Some(journal) = self.journal {
            search = search.with_journal(journal);
        }
        Ok(search)
    }
}

/// Parameters for retrieving one paper.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetPubmedFulltextParams {
    pub pubmed_id: String,
}

const DISABLED: &str = "PubMed search is not enabled";

#[tool_router(router = tool_router_literature, vis = "pub")]
impl WarehouseMcp {
    #[tool(description = "Search PubMed for papers matching the given query. \
Use this tool when you need to find scientific papers relevant to the user's query. \
Results contain metadata and the abstract but not the full text; use get_pubmed_fulltext for that.")]
    async fn list_pubmed_papers(
        &self,
        Parameters(params): Parameters<ListPubmedPapersParams>,
    ) -> Result<CallToolResult, ErrorData> {
        const TOOL: &str = "list_pubmed_papers";
        if !self.control.literature_enabled() {
            return Ok(helpers::error_result(TOOL, DISABLED));
        }
        let search = match params.into_search() {
            Ok(search) => search,
            Err(err) => {
                return Ok(helpers::error_result(
                    TOOL,
                    format!("Invalid search parameters: {err}"),
                ));
            }
        };
        Ok(match self.control.search_papers(&search).await {
            Ok(papers) => helpers::text_result(papers),
            Err(ControlError::LiteratureDisabled) => helpers::error_result(TOOL, DISABLED),
            Err(ControlError::Literature(err @ LiteratureError::InvalidParameters(_))) => {
                helpers::error_result(TOOL, format!("Invalid search parameters: {err}"))
            }
            Err(err) => helpers::error_result(TOOL, format!("Error searching PubMed: {err}")),
        })
    }

    #[tool(description = "Retrieve the full text of a paper by its PubMed id. \
Use this tool after list_pubmed_papers has found the paper. Falls back to the abstract when no full text is available.")]
    async fn get_pubmed_fulltext(
        &self,
        Parameters(params): Parameters<GetPubmedFulltextParams>,
    ) -> Result<CallToolResult, ErrorData> {
        const TOOL: &str = "get_pubmed_fulltext";
        Ok(match self.control.get_paper_fulltext(&params.pubmed_id).await {
            Ok(paper) => helpers::text_result(paper),
            Err(ControlError::LiteratureDisabled) => helpers::error_result(TOOL, DISABLED),
            Err(err) => helpers::error_result(TOOL, format!("Error retrieving paper: {err}")),
        })
    }
}
