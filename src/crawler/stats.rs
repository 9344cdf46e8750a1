//! Outcome counters for pages, sub-categories and whole runs

use crate::crawler::extractor::ExtractOutcome;
use std::fmt;
use std::ops::AddAssign;

/// Counts of what a harvest (or part of one) did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestStats {
    /// Listing pages fetched successfully
    pub pages_fetched: u64,
    pub inserted: u64,
    pub duplicates: u64,
    pub already_contacted: u64,
    pub missing_email: u64,
    pub not_a_profile: u64,
    pub fetch_failed: u64,
    /// Extractions that ended in a storage error or a panic
    pub failed_tasks: u64,
}

impl HarvestStats {
    /// Counts one extraction outcome
    pub fn record(&mut self, outcome: ExtractOutcome) {
        match outcome {
            ExtractOutcome::FetchFailed => self.fetch_failed += 1,
            ExtractOutcome::NotAProfile => self.not_a_profile += 1,
            ExtractOutcome::MissingEmail => self.missing_email += 1,
            ExtractOutcome::AlreadyContacted => self.already_contacted += 1,
            ExtractOutcome::Inserted => self.inserted += 1,
            ExtractOutcome::Duplicate => self.duplicates += 1,
        }
    }

    /// Number of listing entries processed, whatever their outcome
    pub fn companies_seen(&self) -> u64 {
        self.inserted
            + self.duplicates
            + self.already_contacted
            + self.missing_email
            + self.not_a_profile
            + self.fetch_failed
            + self.failed_tasks
    }
}

impl AddAssign for HarvestStats {
    fn add_assign(&mut self, other: Self) {
        self.pages_fetched += other.pages_fetched;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.already_contacted += other.already_contacted;
        self.missing_email += other.missing_email;
        self.not_a_profile += other.not_a_profile;
        self.fetch_failed += other.fetch_failed;
        self.failed_tasks += other.failed_tasks;
    }
}

impl fmt::Display for HarvestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} companies seen: {} inserted, {} duplicate, {} already contacted, \
             {} without email, {} not a profile, {} unreachable, {} failed",
            self.pages_fetched,
            self.companies_seen(),
            self.inserted,
            self.duplicates,
            self.already_contacted,
            self.missing_email,
            self.not_a_profile,
            self.fetch_failed,
            self.failed_tasks
        )
    }
}
