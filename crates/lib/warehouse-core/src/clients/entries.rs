use std::{error::Error, fmt, time::Duration};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const API_PATH: &str = "/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub enum EntriesError {
    Http(Box<reqwest::Error>),
    Status { status: u16, body: String },
    InvalidInput(String),
}

impl fmt::Display for EntriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "{err}"),
            Self::Status { status, body } if body.is_empty() => {
                write!(f, "request failed with status {status}")
            }
            Self::Status { status, body } => {
                write!(f, "request failed with status {status}: {body}")
            }
            Self::InvalidInput(message) => write!(f, "Invalid input: {message}"),
        }
    }
}

impl Error for EntriesError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err.as_ref()),
            Self::Status { .. } | Self::InvalidInput(_) => None,
        }
    }
}

impl From<reqwest::Error> for EntriesError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

#[derive(Debug, Deserialize)]
struct EntryEnvelope {
    entry: Value,
}

#[derive(Debug, Deserialize)]
struct EntriesEnvelope {
    #[serde(default)]
    entries: Vec<Value>,
}

/// Appends the API version path unless the URL already ends with it.
#[must_use]
pub fn normalize_api_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with(API_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{API_PATH}")
    }
}

/// Client for the notebook entries REST API.
#[derive(Clone)]
pub struct EntriesClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl fmt::Debug for EntriesClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntriesClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl EntriesClient {
    /// Builds a client for `base_url`, authenticating with `api_key`.
    ///
    /// # Errors
    /// Returns `EntriesError` if the key is blank or the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, EntriesError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EntriesError::InvalidInput("api key is required".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: normalize_api_base_url(base_url),
            api_key,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches one entry, or several in a single bulk request.
    ///
    /// # Errors
    /// Returns `EntriesError` if no ids are given, an id is malformed, or the
    /// request fails.
    pub async fn get_entries(&self, entry_ids: &[String]) -> Result<Vec<Value>, EntriesError> {
        let ids: Vec<&str> = entry_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(EntriesError::InvalidInput(
                "at least one entry id is required".to_string(),
            ));
        }
        if let Some(bad) = ids
            .iter()
            .find(|id| id.contains(|ch: char| matches!(ch, '/' | '?' | '#' | ',')))
        {
            return Err(EntriesError::InvalidInput(format!("invalid entry id: {bad}")));
        }

        match ids.as_slice() {
            [id] => Ok(vec![self.get_entry(id).await?]),
            _ => self.bulk_get_entries(&ids).await,
        }
    }

    /// Fetches a single entry by id.
    ///
    /// # Errors
    /// Returns `EntriesError` if the request fails or the response is not an entry.
    pub async fn get_entry(&self, entry_id: &str) -> Result<Value, EntriesError> {
        let url = format!("{}/entries/{entry_id}", self.base_url);
        debug!(%url, "fetching entry");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;
        let envelope: EntryEnvelope = checked(response).await?.json().await?;
        Ok(envelope.entry)
    }

    /// Fetches several entries with one bulk request.
    ///
    /// # Errors
    /// Returns `EntriesError` if the request fails or the response has no entries list.
    pub async fn bulk_get_entries(&self, entry_ids: &[&str]) -> Result<Vec<Value>, EntriesError> {
        let url = format!("{}/entries:bulk-get", self.base_url);
        debug!(%url, count = entry_ids.len(), "fetching entries");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .query(&[("entryIds", entry_ids.join(","))])
            .send()
            .await?;
        let envelope: EntriesEnvelope = checked(response).await?.json().await?;
        Ok(envelope.entries)
    }
}

async fn checked(response: reqwest::Response) -> Result<reqwest::Response, EntriesError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(EntriesError::Status {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}
