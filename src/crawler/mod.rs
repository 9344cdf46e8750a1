//! Crawler module for category walking and company extraction
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with bounded retries
//! - Selector-driven parsing of category, listing and profile pages
//! - Per-company extraction with contacted-email deduplication
//! - Paginated listing traversal with a per-page barrier
//! - Overall harvest coordination

mod coordinator;
mod extractor;
mod fetcher;
mod pagination;
mod parser;
mod stats;

pub use coordinator::Harvester;
pub use extractor::{CompanyExtractor, ExtractOutcome};
pub use fetcher::{build_http_client, FetchResult, Fetcher};
pub use pagination::PaginationWalker;
pub use parser::{CategoryLink, CompanyProfile, PageParser};
pub use stats::HarvestStats;

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete harvest against the configured database
///
/// # Example
///
/// ```no_run
/// use directory_harvest::config::load_config_with_hash;
/// use directory_harvest::crawler::harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let stats = harvest(&config, &hash).await?;
/// println!("{}", stats);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(config: &Config, config_hash: &str) -> Result<HarvestStats, HarvestError> {
    Harvester::new(config, config_hash)?.run().await
}
