//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the offer database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track update passes
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_url TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    new_offers INTEGER,
    updated_offers INTEGER,
    inactive_offers INTEGER,
    failed_fetches INTEGER,
    error_message TEXT
);

-- One row per unique listing; the URL is the identity
CREATE TABLE IF NOT EXISTS offers (
    url TEXT PRIMARY KEY,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    origin_search TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_offers_active ON offers(is_active);
CREATE INDEX IF NOT EXISTS idx_offers_origin ON offers(origin_search);

-- Scraped detail fields, write-once per (listing, field)
CREATE TABLE IF NOT EXISTS offer_attributes (
    offer_url TEXT NOT NULL REFERENCES offers(url),
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (offer_url, name)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
