//! Offer-Radar: a vehicle listing tracker
//!
//! This crate tracks classified-ad vehicle listings found through a saved
//! search on a listings site. Each pass re-queries the search, fetches detail
//! pages for listings it has never seen, and ages out listings that stopped
//! appearing in the results.

pub mod config;
pub mod offers;
pub mod scrape;
pub mod storage;

use thiserror::Error;

/// Main error type for Offer-Radar operations
#[derive(Debug, Error)]
pub enum RadarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Detail parse error for {url}: {message}")]
    DetailParse { url: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Search pass for {search_url} yielded no pages; refusing to touch the store")]
    EmptySearch { search_url: String },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

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
}

/// Result type alias for Offer-Radar operations
pub type Result<T> = std::result::Result<T, RadarError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use offers::reconcile::{reconcile, ReconcileOutcome};
pub use offers::tracker::OfferTracker;
pub use offers::{OfferAttributes, OfferRecord, UpdateStats};
pub use storage::{OfferStore, SqliteStore, StoreStats};
