//! Company extraction from a single profile page
//!
//! One extraction fetches the profile, parses its embedded payload, runs the
//! contacted-email pre-check and hands the record to the store. Extractions
//! for different URLs run concurrently and share nothing but the store.

use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{CompanyProfile, PageParser};
use crate::storage::{lock_store, CompanyRecord, InsertOutcome, SharedStore};
use crate::HarvestError;
use std::sync::Arc;

/// What happened to one listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The profile page could not be fetched
    FetchFailed,
    /// The page carries no profile payload
    NotAProfile,
    /// The profile has no contact email
    MissingEmail,
    /// The email is already in the contacted set
    AlreadyContacted,
    /// A new record was stored
    Inserted,
    /// The store already holds a record with this email
    Duplicate,
}

/// Fetches and stores company profiles
pub struct CompanyExtractor {
    fetcher: Fetcher,
    parser: Arc<PageParser>,
    store: SharedStore,
}

impl CompanyExtractor {
    pub fn new(fetcher: Fetcher, parser: Arc<PageParser>, store: SharedStore) -> Self {
        Self {
            fetcher,
            parser,
            store,
        }
    }

    /// Extracts the company behind `company_url` and stores it under the given categories
    ///
    /// Only storage failures are errors; every other way a profile can fall
    /// through is reported as an [`ExtractOutcome`].
    pub async fn extract(
        &self,
        company_url: &str,
        main_category: &str,
        sub_category: &str,
    ) -> Result<ExtractOutcome, HarvestError> {
        let Some(body) = self.fetcher.fetch(company_url, &[]).await.into_body() else {
            return Ok(ExtractOutcome::FetchFailed);
        };

        let Some(profile) = self.parser.extract_profile(&body) else {
            tracing::debug!("No profile payload on {}", company_url);
            return Ok(ExtractOutcome::NotAProfile);
        };

        if profile.email.is_empty() {
            tracing::warn!("No email on {}, skipping", company_url);
            return Ok(ExtractOutcome::MissingEmail);
        }

        let mut store = lock_store(&self.store);

        if store.is_contacted(&profile.email)? {
            tracing::warn!("{} already contacted, skipping", profile.email);
            return Ok(ExtractOutcome::AlreadyContacted);
        }

        let record = build_record(profile, company_url, main_category, sub_category);
        let outcome = match store.insert_company(&record)? {
            InsertOutcome::Inserted => {
                tracing::debug!("Stored {} ({})", record.company_name, record.email);
                ExtractOutcome::Inserted
            }
            InsertOutcome::Duplicate => ExtractOutcome::Duplicate,
        };

        Ok(outcome)
    }
}

fn build_record(
    profile: CompanyProfile,
    company_url: &str,
    main_category: &str,
    sub_category: &str,
) -> CompanyRecord {
    CompanyRecord {
        company_name: profile.company_name,
        organization_name: profile.organization_name,
        address: profile.address,
        phone: profile.phone,
        website: profile.website,
        email: profile.email,
        company_url: company_url.to_string(),
        rating_count: profile.rating_count,
        rating_value: profile.rating_value,
        main_category: main_category.to_string(),
        sub_category: sub_category.to_string(),
    }
}
