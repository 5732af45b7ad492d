use serde::{Deserialize, Serialize};

/// Author as listed in a `PubMed` record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub last_name: String,
    pub first_name: String,
}

/// Journal citation details.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalInfo {
    pub name: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
}

/// Search-result level metadata for one paper. Never carries full text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperSummary {
    pub pubmed_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<Author>,
    pub journal: JournalInfo,
    /// `Year-Month-Day` with whichever parts the record has.
    pub publication_date: String,
}

/// Where a paper's full text came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FullTextSource {
    #[serde(rename = "PMC")]
    Pmc,
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "abstract")]
    Abstract,
}

impl FullTextSource {
    #[must_use]
    pub const fn available_content(self) -> &'static str {
        match self {
            Self::Pmc | Self::Pdf => "full_text",
            Self::Abstract => "abstract",
        }
    }
}

/// A pointer to a full-text copy of a paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullTextLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// A paper with the best text that could be retrieved for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperFullText {
    #[serde(flatten)]
    pub paper: PaperSummary,
    pub full_text: String,
    pub full_text_source: FullTextSource,
    pub available_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_links: Option<Vec<FullTextLink>>,
}

impl PaperFullText {
    pub fn new(
        paper: PaperSummary,
        full_text: impl Into<String>,
        source: FullTextSource,
        full_text_links: Option<Vec<FullTextLink>>,
    ) -> Self {
        Self {
            paper,
            full_text: full_text.into(),
            full_text_source: source,
            available_content: source.available_content().to_string(),
            full_text_links,
        }
    }
}
