//! `PubMed` E-utilities and PMC OAI client.
//!
//! Searches go through `ESearch` (JSON) and `EFetch` (XML). Full text is
//! resolved in order of preference: the PMC open-access record, a publisher
//! PDF linked from the `PubMed` record, and finally the abstract.

use std::{error::Error, fmt, time::Duration};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use warehouse_store::literature::{FullTextSource, PaperFullText, PaperSummary};

use crate::parsers::{
    PmcParseError,
    PubmedParseError,
    extract_links,
    extract_plaintext,
    parse_articles,
};

pub const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
pub const PMC_OAI_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/oai/oai.cgi";
pub const MAX_PUBMED_RESULTS: u32 = 100;
pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const VALID_ARTICLE_TYPES: [&str; 8] = [
    "clinical trial",
    "review",
    "meta-analysis",
    "case report",
    "letter",
    "editorial",
    "comment",
    "systematic review",
];

#[derive(Debug)]
pub enum LiteratureError {
    InvalidParameters(String),
    Http(Box<reqwest::Error>),
    Parse(String),
    NotFound(String),
}

impl fmt::Display for LiteratureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters(message) | Self::Parse(message) | Self::NotFound(message) => {
                write!(f, "{message}")
            }
            Self::Http(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LiteratureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LiteratureError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl From<PubmedParseError> for LiteratureError {
    fn from(err: PubmedParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<PmcParseError> for LiteratureError {
    fn from(err: PmcParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result ordering accepted by `ESearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    Date,
}

impl SortOrder {
    /// Parses a `sort_by` argument.
    ///
    /// # Errors
    /// Returns `LiteratureError::InvalidParameters` for anything but `relevance` or `date`.
    pub fn parse(value: &str) -> Result<Self, LiteratureError> {
        match value {
            "relevance" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            _ => Err(LiteratureError::InvalidParameters(
                "Invalid sort_by value. Must be one of: relevance, date".to_string(),
            )),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
        }
    }
}

/// Publication date bounds for a search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Parses optional date bounds given as `YYYY-MM-DD`, `YYYY/MM/DD` or an
    /// ISO-8601 timestamp. Blank bounds are ignored.
    ///
    /// # Errors
    /// Returns `LiteratureError::InvalidParameters` if a bound is not a date.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, LiteratureError> {
        Ok(Self {
            start: parse_bound("start", start)?,
            end: parse_bound("end", end)?,
        })
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn parse_bound(name: &str, value: Option<&str>) -> Result<Option<NaiveDate>, LiteratureError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive()))
        .map(Some)
        .map_err(|_| {
            LiteratureError::InvalidParameters(format!(
                "Invalid date_range {name} '{value}'. Expected YYYY-MM-DD"
            ))
        })
}

/// A literature search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperSearch {
    pub query: String,
    pub max_results: i64,
    pub date_range: Option<DateRange>,
    pub sort_by: String,
    pub article_type: Option<String>,
    pub journal: Option<String>,
}

impl PaperSearch {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: i64::from(DEFAULT_MAX_RESULTS),
            date_range: None,
            sort_by: SortOrder::Relevance.as_str().to_string(),
            article_type: None,
            journal: None,
        }
    }

    #[must_use]
    pub const fn with_max_results(mut self, max_results: i64) -> Self {
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub const fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = Some(date_range);
        self
    }

    #[must_use]
    pub fn with_sort_by(mut self, sort_by: impl Into<String>) -> Self {
        self.sort_by = sort_by.into();
        self
    }

    #[must_use]
    pub fn with_article_type(mut self, article_type: impl Into<String>) -> Self {
        self.article_type = Some(article_type.into());
        self
    }

    #[must_use]
    pub fn with_journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    /// Checks the parameters in a fixed order and returns the sort order.
    ///
    /// # Errors
    /// Returns `LiteratureError::InvalidParameters` describing the first bad parameter.
    pub fn validate(&self) -> Result<SortOrder, LiteratureError> {
        if self.query.trim().is_empty() {
            return Err(LiteratureError::InvalidParameters(
                "query cannot be empty".to_string(),
            ));
        }
        if self.max_results <= 0 {
            return Err(LiteratureError::InvalidParameters(
                "max_results must be greater than 0".to_string(),
            ));
        }
        if self.max_results > i64::from(MAX_PUBMED_RESULTS) {
            return Err(LiteratureError::InvalidParameters(format!(
                "max_results cannot exceed {MAX_PUBMED_RESULTS}"
            )));
        }
        let sort = SortOrder::parse(&self.sort_by)?;
        if let Some(article_type) = &self.article_type
            && !VALID_ARTICLE_TYPES.contains(&article_type.to_lowercase().as_str())
        {
            return Err(LiteratureError::InvalidParameters(format!(
                "Invalid article_type. Must be one of: {}",
                VALID_ARTICLE_TYPES.join(", ")
            )));
        }
        if let Some(journal) = &self.journal
            && journal.trim().is_empty()
        {
            return Err(LiteratureError::InvalidParameters(
                "journal cannot be empty".to_string(),
            ));
        }
        Ok(sort)
    }

    /// The `ESearch` term with publication type and journal filters applied.
    #[must_use]
    pub fn term(&self) -> String {
        let mut term = self.query.trim().to_string();
        if let Some(article_type) = &self.article_type {
            term.push_str(&format!(" AND {article_type}[Publication Type]"));
        }
        if let Some(journal) = &self.journal {
            term.push_str(&format!(" AND {}[Journal]", journal.trim()));
        }
        term
    }

    fn esearch_params(&self, sort: SortOrder) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", self.term()),
            ("retmax", self.max_results.to_string()),
            ("retmode", "json".to_string()),
            ("sort", sort.as_str().to_string()),
        ];
        if let Some(range) = self.date_range {
            if let Some(start) = range.start {
                params.push(("mindate", start.format("%Y/%m/%d").to_string()));
            }
            if let Some(end) = range.end {
                params.push(("maxdate", end.format("%Y/%m/%d").to_string()));
            }
            if !range.is_empty() {
                params.push(("datetype", "pdat".to_string()));
            }
        }
        params
    }
}

/// Endpoints and timeouts for the literature client.
#[derive(Debug, Clone)]
pub struct PubMedClientConfig {
    pub eutils_base_url: String,
    pub pmc_oai_url: String,
    pub request_timeout: Duration,
}

impl Default for PubMedClientConfig {
    fn default() -> Self {
        Self {
            eutils_base_url: EUTILS_BASE_URL.to_string(),
            pmc_oai_url: PMC_OAI_URL.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl PubMedClientConfig {
    #[must_use]
    pub fn with_eutils_base_url(mut self, url: impl Into<String>) -> Self {
        self.eutils_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_pmc_oai_url(mut self, url: impl Into<String>) -> Self {
        self.pmc_oai_url = url.into();
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResponse {
    #[serde(default)]
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ELinkResponse {
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkSet {
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Default, Deserialize)]
struct LinkSetDb {
    #[serde(default)]
    links: Vec<Value>,
}

/// Client for `PubMed` search and full-text retrieval.
#[derive(Debug, Clone)]
pub struct PubMedClient {
    http: reqwest::Client,
    config: PubMedClientConfig,
}

impl PubMedClient {
    /// Builds a client against the public NCBI endpoints.
    ///
    /// # Errors
    /// Returns `LiteratureError` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, LiteratureError> {
        Self::with_config(PubMedClientConfig::default())
    }

    /// Builds a client against custom endpoints.
    ///
    /// # Errors
    /// Returns `LiteratureError` if the HTTP client cannot be built.
    pub fn with_config(config: PubMedClientConfig) -> Result<Self, LiteratureError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("warehouse-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, config })
    }

    #[must_use]
    pub const fn config(&self) -> &PubMedClientConfig {
        &self.config
    }

    /// Searches `PubMed` and returns summaries of the matching papers.
    ///
    /// # Errors
    /// Returns `LiteratureError::InvalidParameters` for bad parameters, and
    /// other variants when a request or the response parsing fails.
    pub async fn search_papers(
        &self,
        search: &PaperSearch,
    ) -> Result<Vec<PaperSummary>, LiteratureError> {
        let sort = search.validate()?;
        let url = self.eutils_url("esearch.fcgi");
        debug!(term = %search.term(), "searching pubmed");
        let response: ESearchResponse = self
            .http
            .get(&url)
            .query(&search.esearch_params(sort))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ids = response
            .esearchresult
            .map(|result| result.idlist)
            .unwrap_or_default();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let papers = parse_articles(&self.fetch_records(&ids).await?)?;
        info!(results = papers.len(), "pubmed search finished");
        Ok(papers)
    }

    /// Retrieves a paper with the best available text.
    ///
    /// # Errors
    /// Returns `LiteratureError::NotFound` if the id matches no record, and
    /// other variants when the record itself cannot be fetched. Failures while
    /// looking for full text only lower the quality of the result.
    pub async fn get_paper_fulltext(
        &self,
        pubmed_id: &str,
    ) -> Result<PaperFullText, LiteratureError> {
        let pubmed_id = pubmed_id.trim();
        if pubmed_id.is_empty() {
            return Err(LiteratureError::InvalidParameters(
                "pubmed_id is required".to_string(),
            ));
        }

        let record = self.fetch_records(&[pubmed_id.to_string()]).await?;
        let mut paper = parse_articles(&record)?
            .into_iter()
            .next()
            .ok_or_else(|| LiteratureError::NotFound("Paper not found".to_string()))?;
        pubmed_id.clone_into(&mut paper.pubmed_id);

        if let Some(pmc_id) = self.get_pmc_id(pubmed_id).await
            && let Some(text) = self.pmc_plaintext(&pmc_id).await
        {
            return Ok(PaperFullText::new(paper, text, FullTextSource::Pmc, None));
        }

        let links = extract_links(&record)?;
        for url in &links.pdf_candidates {
            if let Some(text) = self.pdf_text(url).await {
                return Ok(PaperFullText::new(
                    paper,
                    text,
                    FullTextSource::Pdf,
                    Some(links.links),
                ));
            }
        }

        let text = paper.abstract_text.clone();
        Ok(PaperFullText::new(
            paper,
            text,
            FullTextSource::Abstract,
            Some(links.links),
        ))
    }

    async fn fetch_records(&self, ids: &[String]) -> Result<String, LiteratureError> {
        let url = self.eutils_url("efetch.fcgi");
        let text = self
            .http
            .get(&url)
            .query(&[
                ("db", "pubmed".to_string()),
                ("id", ids.join(",")),
                ("retmode", "xml".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn get_pmc_id(&self, pubmed_id: &str) -> Option<String> {
        match self.request_pmc_id(pubmed_id).await {
            Ok(pmc_id) => pmc_id,
            Err(err) => {
                warn!(pubmed_id, error = %err, "pmc id lookup failed");
                None
            }
        }
    }

    async fn request_pmc_id(&self, pubmed_id: &str) -> Result<Option<String>, LiteratureError> {
        let url = self.eutils_url("elink.fcgi");
        let response: ELinkResponse = self
            .http
            .get(&url)
            .query(&[
                ("dbfrom", "pubmed"),
                ("db", "pmc"),
                ("id", pubmed_id),
                ("retmode", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let link = response
            .linksets
            .into_iter()
            .next()
            .and_then(|set| set.linksetdbs.into_iter().next())
            .and_then(|db| db.links.into_iter().next());
        Ok(link.and_then(|link| match link {
            Value::String(id) => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }))
    }

    async fn pmc_plaintext(&self, pmc_id: &str) -> Option<String> {
        match self.request_pmc_plaintext(pmc_id).await {
            Ok(text) => text,
            Err(err) => {
                warn!(pmc_id, error = %err, "pmc full text retrieval failed");
                None
            }
        }
    }

    async fn request_pmc_plaintext(&self, pmc_id: &str) -> Result<Option<String>, LiteratureError> {
        let digits = pmc_id.trim().trim_start_matches("PMC");
        let identifier = format!("oai:pubmedcentral.nih.gov:{digits}");
        let xml = self
            .http
            .get(&self.config.pmc_oai_url)
            .query(&[
                ("verb", "GetRecord"),
                ("identifier", identifier.as_str()),
                ("metadataPrefix", "pmc"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_plaintext(&xml)?)
    }

    async fn pdf_text(&self, url: &str) -> Option<String> {
        match self.request_pdf_text(url).await {
            Ok(text) => text,
            Err(err) => {
                warn!(url, error = %err, "pdf extraction failed");
                None
            }
        }
    }

    async fn request_pdf_text(&self, url: &str) -> Result<Option<String>, LiteratureError> {
        let bytes = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|err| LiteratureError::Parse(err.to_string()))?
            .map_err(|err| LiteratureError::Parse(format!("PDF parse error: {err}")))?;
        let text = text.trim();
        Ok(if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        })
    }

    fn eutils_url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.config.eutils_base_url)
    }
}
