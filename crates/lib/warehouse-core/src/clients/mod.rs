//! HTTP clients for the services next to the warehouse.

pub mod entries;
pub mod pubmed;

pub use entries::{EntriesClient, EntriesError, normalize_api_base_url};
pub use pubmed::{
    DateRange,
    LiteratureError,
    PaperSearch,
    PubMedClient,
    PubMedClientConfig,
    SortOrder,
};
