//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Directory-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    companies_inserted INTEGER NOT NULL DEFAULT 0
);

-- Harvested companies, one per contact email
CREATE TABLE IF NOT EXISTS crawled_companies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    company_name TEXT NOT NULL,
    organization_name TEXT NOT NULL,
    address TEXT NOT NULL,
    phone TEXT NOT NULL,
    website TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE CHECK (email <> ''),
    company_url TEXT NOT NULL,
    rating_count TEXT NOT NULL,
    rating_value TEXT NOT NULL,
    main_category TEXT NOT NULL,
    sub_category TEXT NOT NULL,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_companies_category
    ON crawled_companies(main_category, sub_category);

-- Emails already contacted by the outreach workflow (owned there, read here)
CREATE TABLE IF NOT EXISTS contacted_emails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    address TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT '',
    company_name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL,
    is_send INTEGER NOT NULL DEFAULT 0,
    phone TEXT NOT NULL DEFAULT '',
    website TEXT NOT NULL DEFAULT '',
    source_site TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_contacted_emails_email ON contacted_emails(email);
"#;

/// Initializes the database schema
///
/// Every statement is `IF NOT EXISTS`, so running this against an already
/// initialized database is a no-op.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
