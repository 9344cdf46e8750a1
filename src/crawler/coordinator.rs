//! Harvest coordinator - category discovery and run bookkeeping
//!
//! The coordinator walks the category tree top-down:
//! - Fetch the root listing and extract the main categories
//! - For each main category, fetch its page and extract the sub-categories
//! - Hand each sub-category to the pagination walker
//!
//! Main categories and sub-categories are processed strictly sequentially;
//! concurrency only exists among the companies of a single listing page.

use crate::config::Config;
use crate::crawler::extractor::CompanyExtractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pagination::PaginationWalker;
use crate::crawler::parser::{CategoryLink, PageParser};
use crate::crawler::stats::HarvestStats;
use crate::storage::{lock_store, shared, SharedStore, SqliteStorage};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;

/// Main harvester structure
pub struct Harvester {
    store: SharedStore,
    fetcher: Fetcher,
    parser: Arc<PageParser>,
    walker: PaginationWalker,
    root_url: String,
    max_main_categories: Option<usize>,
    config_hash: String,
}

impl Harvester {
    /// Creates a harvester writing to the configured SQLite database
    ///
    /// # Arguments
    ///
    /// * `config` - Validated harvest configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Harvester with its database opened
    /// * `Err(HarvestError)` - The database, HTTP client or parser could not be set up
    pub fn new(config: &Config, config_hash: &str) -> Result<Self, HarvestError> {
        let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
        Self::with_store(config, shared(storage), config_hash)
    }

    /// Creates a harvester writing to an existing store handle
    pub fn with_store(
        config: &Config,
        store: SharedStore,
        config_hash: &str,
    ) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(&config.crawler)?;
        let parser = Arc::new(PageParser::new(&config.site.base_url, &config.selectors)?);

        let extractor = Arc::new(CompanyExtractor::new(
            fetcher.clone(),
            Arc::clone(&parser),
            Arc::clone(&store),
        ));
        let walker = PaginationWalker::new(
            fetcher.clone(),
            Arc::clone(&parser),
            extractor,
            config.crawler.max_concurrent_extractions as usize,
        )
        .with_start_page(config.crawler.start_page)
        .with_max_pages(config.crawler.max_pages_per_sub_category);

        Ok(Self {
            store,
            fetcher,
            parser,
            walker,
            root_url: config.site.root_url(),
            max_main_categories: config.crawler.max_main_categories,
            config_hash: config_hash.to_string(),
        })
    }

    /// Runs a complete harvest
    ///
    /// Prepares the schema, records a run, walks every category and marks the
    /// run completed (or failed if a database failure aborted it).
    pub async fn run(&self) -> Result<HarvestStats, HarvestError> {
        lock_store(&self.store).ensure_schema()?;
        let run_id = lock_store(&self.store).create_run(&self.config_hash)?;
        tracing::info!("Starting harvest run {} from {}", run_id, self.root_url);

        let result = self.harvest().await;

        match result {
            Ok(stats) => {
                lock_store(&self.store).complete_run(run_id, stats.inserted)?;
                tracing::info!("Harvest run {} completed: {}", run_id, stats);
                Ok(stats)
            }
            Err(e) => {
                if let Err(mark_err) = lock_store(&self.store).fail_run(run_id) {
                    tracing::warn!("Could not mark run {} as failed: {}", run_id, mark_err);
                }
                Err(e)
            }
        }
    }

    async fn harvest(&self) -> Result<HarvestStats, HarvestError> {
        let Some(body) = self.fetcher.fetch(&self.root_url, &[]).await.into_body() else {
            tracing::error!("Root listing {} unavailable, nothing to harvest", self.root_url);
            return Ok(HarvestStats::default());
        };

        let mut main_categories = self.parser.extract_main_categories(&body);
        let discovered = main_categories.len();
        if let Some(limit) = self.max_main_categories {
            main_categories.truncate(limit);
        }
        tracing::info!(
            "Found {} main categories, harvesting {}",
            discovered,
            main_categories.len()
        );

        let mut total = HarvestStats::default();
        for (index, main_category) in main_categories.iter().enumerate() {
            tracing::info!(
                "Main category {}/{}: {}",
                index + 1,
                main_categories.len(),
                main_category.name
            );
            total += self.harvest_main_category(main_category).await?;
        }

        Ok(total)
    }

    async fn harvest_main_category(
        &self,
        main_category: &CategoryLink,
    ) -> Result<HarvestStats, HarvestError> {
        let mut total = HarvestStats::default();

        let Some(body) = self.fetcher.fetch(&main_category.url, &[]).await.into_body() else {
            tracing::warn!(
                "Main category {} unavailable, skipping",
                main_category.name
            );
            return Ok(total);
        };

        let sub_categories = self.parser.extract_sub_categories(&body);
        for (index, sub_category) in sub_categories.iter().enumerate() {
            tracing::info!(
                "Sub category {}/{}: {} / {}",
                index + 1,
                sub_categories.len(),
                main_category.name,
                sub_category.name
            );

            let stats = self
                .walker
                .walk(&main_category.name, &sub_category.name, &sub_category.url)
                .await?;
            tracing::info!("{} / {} done: {}", main_category.name, sub_category.name, stats);
            total += stats;
        }

        Ok(total)
    }
}
