use tracing::info;

use crate::clients::PaperSearch;

use super::{ControlError, WarehouseControlPlane};

impl WarehouseControlPlane {
    /// Searches `PubMed` and renders the paper summaries as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ControlError::LiteratureDisabled` when literature search is off,
    /// and `ControlError::Literature` for invalid parameters or failed requests.
    pub async fn search_papers(&self, search: &PaperSearch) -> Result<String, ControlError> {
        let client = self.literature()?;
        info!(query = %search.query, "searching pubmed");
        let papers = client.search_papers(search).await?;
        Ok(serde_json::to_string_pretty(&papers)?)
    }

    /// Retrieves a paper's best available text as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `ControlError::LiteratureDisabled` when literature search is off,
    /// and `ControlError::Literature` if the paper cannot be retrieved.
    pub async fn get_paper_fulltext(&self, pubmed_id: &str) -> Result<String, ControlError> {
        let client = self.literature()?;
        info!(pubmed_id, "retrieving paper full text");
        let paper = client.get_paper_fulltext(pubmed_id).await?;
        info!(
            pubmed_id,
            source = paper.available_content.as_str(),
            "paper retrieved"
        );
        Ok(serde_json::to_string_pretty(&paper)?)
    }
}
