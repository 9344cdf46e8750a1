//! Paginated listing traversal for one sub-category
//!
//! Pages are fetched strictly one after another. The companies listed on a
//! page are extracted concurrently, gated by a semaphore, and every one of
//! them finishes before the next page is requested.
//!
//! The walk ends at the first page that cannot be fetched, the first page
//! that lists no companies, or after the configured page limit. A database
//! failure in any extraction ends it with an error once the page has joined.

use crate::crawler::extractor::CompanyExtractor;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::PageParser;
use crate::crawler::stats::HarvestStats;
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Walks the listing pages of sub-categories
pub struct PaginationWalker {
    fetcher: Fetcher,
    parser: Arc<PageParser>,
    extractor: Arc<CompanyExtractor>,
    gate: Arc<Semaphore>,
    start_page: u32,
    max_pages: Option<u32>,
}

impl PaginationWalker {
    /// Creates a walker allowing `max_concurrent` extractions at a time
    pub fn new(
        fetcher: Fetcher,
        parser: Arc<PageParser>,
        extractor: Arc<CompanyExtractor>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fetcher,
            parser,
            extractor,
            gate: Arc::new(Semaphore::new(max_concurrent)),
            start_page: 1,
            max_pages: None,
        }
    }

    /// Sets the first page number requested
    pub fn with_start_page(mut self, start_page: u32) -> Self {
        self.start_page = start_page;
        self
    }

    /// Stops every walk after `max_pages` listing pages
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Harvests every listing page of one sub-category
    pub async fn walk(
        &self,
        main_category: &str,
        sub_category: &str,
        sub_category_url: &str,
    ) -> Result<HarvestStats, HarvestError> {
        let mut stats = HarvestStats::default();
        let mut page = self.start_page;

        loop {
            if let Some(limit) = self.max_pages {
                if page - self.start_page >= limit {
                    tracing::info!("{} / {}: page limit {} reached", main_category, sub_category, limit);
                    break;
                }
            }

            let query = [("page", page.to_string())];
            let Some(body) = self
                .fetcher
                .fetch(sub_category_url, &query)
                .await
                .into_body()
            else {
                tracing::info!(
                    "{} / {}: page {} unavailable, sub-category finished",
                    main_category,
                    sub_category,
                    page
                );
                break;
            };
            stats.pages_fetched += 1;

            let links = self.parser.extract_listing_links(&body);
            let page_count = self.parser.extract_page_count(&body);
            tracing::info!(
                "{} / {}: page {}/{} lists {} companies",
                main_category,
                sub_category,
                page,
                page_count.as_deref().unwrap_or("???"),
                links.len()
            );

            if links.is_empty() {
                break;
            }

            stats += self.extract_page(links, main_category, sub_category).await?;
            page += 1;
        }

        Ok(stats)
    }

    /// Extracts all companies of one page and waits for every one of them
    async fn extract_page(
        &self,
        links: Vec<String>,
        main_category: &str,
        sub_category: &str,
    ) -> Result<HarvestStats, HarvestError> {
        let main_category: Arc<str> = Arc::from(main_category);
        let sub_category: Arc<str> = Arc::from(sub_category);
        let mut tasks = JoinSet::new();

        for url in links {
            let permit = Arc::clone(&self.gate).acquire_owned().await?;
            let extractor = Arc::clone(&self.extractor);
            let main_category = Arc::clone(&main_category);
            let sub_category = Arc::clone(&sub_category);

            tasks.spawn(async move {
                let _permit = permit;
                let result = extractor.extract(&url, &main_category, &sub_category).await;
                (url, result)
            });
        }

        let mut stats = HarvestStats::default();
        let mut store_failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => stats.record(outcome),
                Ok((url, Err(e))) => {
                    tracing::error!("Failed to store company from {}: {}", url, e);
                    stats.failed_tasks += 1;
                    if e.is_store_failure() && store_failure.is_none() {
                        store_failure = Some(e);
                    }
                }
                Err(e) => {
                    tracing::error!("Extraction task failed: {}", e);
                    stats.failed_tasks += 1;
                }
            }
        }

        match store_failure {
            Some(e) => {
                tracing::error!("Store unusable after page: {}", stats);
                Err(e)
            }
            None => Ok(stats),
        }
    }
}
