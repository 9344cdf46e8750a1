//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CategoryCount, CompanyRecord, InsertOutcome, RunRecord};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A store handle shared between concurrent extraction tasks
pub type SharedStore = Arc<Mutex<dyn CompanyStore + Send>>;

/// Locks a shared store
///
/// A task that panics while holding the lock poisons the mutex. Every store
/// operation is a single SQL statement, so the store is still consistent and
/// the lock is recovered instead of failing every later caller.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, dyn CompanyStore + Send + 'static> {
    store.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Store lock poisoned by a panicked task, recovering");
        store.clear_poison();
        poisoned.into_inner()
    })
}

/// Trait for storage backend implementations
///
/// Uniqueness of `email` must be enforced atomically by the backend itself:
/// concurrent inserts of the same email yield exactly one stored record.
pub trait CompanyStore {
    // ===== Schema =====

    /// Creates tables and indexes if they do not exist yet
    fn ensure_schema(&mut self) -> StorageResult<()>;

    // ===== Companies =====

    /// Persists a company, reporting `Duplicate` when the email is already stored
    ///
    /// A record with an empty email is rejected with `ConstraintViolation`.
    fn insert_company(&mut self, record: &CompanyRecord) -> StorageResult<InsertOutcome>;

    /// Returns true if the email exists in the externally owned contacted set
    fn is_contacted(&self, email: &str) -> StorageResult<bool>;

    // ===== Run Management =====

    /// Creates a new harvest run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with a finish timestamp and insert count
    fn complete_run(&mut self, run_id: i64, companies_inserted: u64) -> StorageResult<()>;

    /// Marks a run as failed
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Total number of stored companies
    fn count_companies(&self) -> StorageResult<u64>;

    /// Stored companies grouped by category, ordered by main then sub category
    fn count_companies_by_category(&self) -> StorageResult<Vec<CategoryCount>>;
}
