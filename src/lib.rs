//! Listing-Harvester: a classifieds catalogue crawler
//!
//! This crate walks the paginated listing index of a classifieds marketplace,
//! either for a search phrase in a region or for a seller's storefront,
//! extracts a structured record from every listing page and filters the
//! results into an ordered catalogue.

pub mod catalogue;
pub mod client;
pub mod config;
pub mod harvest;
pub mod output;
pub mod regions;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Listing-Harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A crawl parameter could not be resolved (e.g. an unknown region name).
    /// Raised before any network activity.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Pagination failed at {url}: {source}")]
    Pagination {
        url: String,
        source: catalogue::PaginationFailure,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Listing-Harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalogue::{AdRecord, Catalogue, CrawlOrchestrator, FilterCriteria, SearchQuery, ShopQuery};
pub use client::{HttpSession, PageSource};
pub use config::Config;
pub use regions::RegionTable;
