//! Storage module for persisting harvested companies
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Company record persistence with email uniqueness
//! - The read-only contacted-email lookup used for deduplication
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{lock_store, CompanyStore, SharedStore, StorageError, StorageResult};

use std::sync::{Arc, Mutex};

/// Wraps a store so it can be shared by concurrent extraction tasks
pub fn shared<S: CompanyStore + Send + 'static>(store: S) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// A company extracted from one profile page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub company_name: String,
    pub organization_name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    /// Unique and non-empty across the store
    pub email: String,
    pub company_url: String,
    pub rating_count: String,
    pub rating_value: String,
    pub main_category: String,
    pub sub_category: String,
}

/// Result of an insert against the email uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Number of stored companies for one (main, sub) category pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub main_category: String,
    pub sub_category: String,
    pub companies: u64,
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub companies_inserted: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
