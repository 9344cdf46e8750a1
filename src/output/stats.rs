//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{CategoryCount, CompanyStore, RunRecord};
use crate::HarvestError;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored companies
    pub total_companies: u64,

    /// Stored companies per (main, sub) category
    pub by_category: Vec<CategoryCount>,

    /// Most recent harvest run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn CompanyStore) -> Result<StoreStatistics, HarvestError> {
    Ok(StoreStatistics {
        total_companies: storage.count_companies()?,
        by_category: storage.count_companies_by_category()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Renders statistics as the text printed by `--stats`
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::from("=== Harvest Statistics ===\n\n");

    out.push_str(&format!("Stored companies: {}\n\n", stats.total_companies));

    match &stats.latest_run {
        Some(run) => {
            out.push_str(&format!("Latest run: #{} ({:?})\n", run.id, run.status));
            out.push_str(&format!("  Started:  {}\n", run.started_at));
            if let Some(finished) = &run.finished_at {
                out.push_str(&format!("  Finished: {}\n", finished));
            }
            out.push_str(&format!("  Inserted: {}\n\n", run.companies_inserted));
        }
        None => out.push_str("No harvest runs recorded\n\n"),
    }

    if !stats.by_category.is_empty() {
        out.push_str("Companies by Category:\n");
        let mut current_main: Option<&str> = None;
        for count in &stats.by_category {
            if current_main != Some(count.main_category.as_str()) {
                out.push_str(&format!("  {}\n", count.main_category));
                current_main = Some(count.main_category.as_str());
            }
            out.push_str(&format!("    {}: {}\n", count.sub_category, count.companies));
        }
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &StoreStatistics) {
    print!("{}", format_statistics(stats));
}
