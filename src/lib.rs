//! Directory-Harvest: a category-walking company directory harvester
//!
//! This crate walks a review site's two-level category tree, paginates every
//! sub-category listing, extracts the structured company profile embedded in
//! each listing entry's page and persists it to SQLite, deduplicated by email.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Directory-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extraction gate closed: {0}")]
    GateClosed(#[from] tokio::sync::AcquireError),
}

impl HarvestError {
    /// Database failures that will hit every later record as well
    ///
    /// A constraint violation concerns a single record and is not included.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Storage(storage::StorageError::Sqlite(_))
        )
    }
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

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Result type alias for Directory-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{ExtractOutcome, HarvestStats, Harvester};
pub use storage::{CompanyRecord, CompanyStore, InsertOutcome, SqliteStorage};
