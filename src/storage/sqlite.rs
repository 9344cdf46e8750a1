//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CompanyStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CompanyStore, StorageError, StorageResult};
use crate::storage::{CategoryCount, CompanyRecord, InsertOutcome, RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and initializes the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        Self::prepare(Connection::open(path)?)
    }

    /// Opens a database file that must already exist
    ///
    /// Used by read-only reporting, where a mistyped path should fail rather
    /// than leave an empty database behind.
    pub fn open_existing(path: &Path) -> Result<Self, HarvestError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::prepare(Connection::open_with_flags(path, flags)?)
    }

    fn prepare(conn: Connection) -> Result<Self, HarvestError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Adds an email to the contacted set
    ///
    /// The contacted set belongs to the outreach workflow; this exists for
    /// importing its data and for seeding test databases.
    pub fn record_contacted(&mut self, email: &str, source_site: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO contacted_emails (email, source_site) VALUES (?1, ?2)",
            params![email, source_site],
        )?;
        Ok(())
    }

    fn read_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Failed),
            companies_inserted: row.get::<_, i64>(5)?.max(0) as u64,
        })
    }
}

impl CompanyStore for SqliteStorage {
    fn ensure_schema(&mut self) -> StorageResult<()> {
        initialize_schema(&self.conn)?;
        Ok(())
    }

    // ===== Companies =====

    fn insert_company(&mut self, record: &CompanyRecord) -> StorageResult<InsertOutcome> {
        if record.email.is_empty() {
            return Err(StorageError::ConstraintViolation(format!(
                "company '{}' has no email",
                record.company_url
            )));
        }

        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT INTO crawled_companies (company_name, organization_name, address, phone,
             website, email, company_url, rating_count, rating_value, main_category,
             sub_category, crawled_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(email) DO NOTHING",
            params![
                record.company_name,
                record.organization_name,
                record.address,
                record.phone,
                record.website,
                record.email,
                record.company_url,
                record.rating_count,
                record.rating_value,
                record.main_category,
                record.sub_category,
                now
            ],
        )?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    fn is_contacted(&self, email: &str) -> StorageResult<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM contacted_emails WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, companies_inserted: u64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, companies_inserted = ?3 WHERE id = ?4",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                companies_inserted as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Failed.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status, companies_inserted
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                Self::read_run,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Statistics =====

    fn count_companies(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM crawled_companies", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_companies_by_category(&self) -> StorageResult<Vec<CategoryCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT main_category, sub_category, COUNT(*) FROM crawled_companies
             GROUP BY main_category, sub_category
             ORDER BY main_category, sub_category",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok(CategoryCount {
                    main_category: row.get(0)?,
                    sub_category: row.get(1)?,
                    companies: row.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}
