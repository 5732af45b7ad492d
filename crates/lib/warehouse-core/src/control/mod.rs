use std::{error::Error, fmt, sync::Arc};

use warehouse_store::models::WarehouseOverview;

use crate::clients::{EntriesClient, EntriesError, LiteratureError, PubMedClient};
use crate::store::{StoreError, WarehouseStore};

pub mod entries;
pub mod literature;
pub mod query;
pub mod tables;

pub use tables::{DEFAULT_MAX_RESPONSE_LENGTH, RESPONSE_MARGIN, paginate_tables};

#[derive(Debug)]
pub enum ControlError {
    Store(StoreError),
    Entries(EntriesError),
    Literature(LiteratureError),
    Serialize(serde_json::Error),
    LiteratureDisabled,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Entries(err) => write!(f, "{err}"),
            Self::Literature(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "{err}"),
            Self::LiteratureDisabled => write!(f, "PubMed search is not enabled"),
        }
    }
}

impl Error for ControlError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Entries(err) => Some(err),
            Self::Literature(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::LiteratureDisabled => None,
        }
    }
}

impl From<StoreError> for ControlError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<EntriesError> for ControlError {
    fn from(err: EntriesError) -> Self {
        Self::Entries(err)
    }
}

impl From<LiteratureError> for ControlError {
    fn from(err: LiteratureError) -> Self {
        Self::Literature(err)
    }
}

impl From<serde_json::Error> for ControlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err)
    }
}

/// Everything the tools operate on: the warehouse pool, the overview built at
/// startup, and the HTTP clients.
#[derive(Clone)]
pub struct WarehouseControlPlane {
    store: WarehouseStore,
    overview: Arc<WarehouseOverview>,
    entries: EntriesClient,
    literature: Option<PubMedClient>,
    max_response_length: usize,
}

impl WarehouseControlPlane {
    pub fn new(store: WarehouseStore, overview: WarehouseOverview, entries: EntriesClient) -> Self {
        Self {
            store,
            overview: Arc::new(overview),
            entries,
            literature: None,
            max_response_length: DEFAULT_MAX_RESPONSE_LENGTH,
        }
    }

    /// Enables the literature tools.
    #[must_use]
    pub fn with_literature(mut self, client: PubMedClient) -> Self {
        self.literature = Some(client);
        self
    }

    #[must_use]
    pub const fn with_max_response_length(mut self, max_response_length: usize) -> Self {
        self.max_response_length = max_response_length;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &WarehouseStore {
        &self.store
    }

    #[must_use]
    pub fn overview(&self) -> &WarehouseOverview {
        &self.overview
    }

    #[must_use]
    pub const fn literature_enabled(&self) -> bool {
        self.literature.is_some()
    }

    #[must_use]
    pub const fn max_response_length(&self) -> usize {
        self.max_response_length
    }

    fn literature(&self) -> Result<&PubMedClient, ControlError> {
        self.literature.as_ref().ok_or(ControlError::LiteratureDisabled)
    }
}
