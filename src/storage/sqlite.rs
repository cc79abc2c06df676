//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the OfferStore trait.

use crate::offers::{OfferAttributes, OfferRecord, UpdateStats};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{OfferStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoreStats};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Gets the most recent run, if any
    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, search_url, config_hash, started_at, finished_at, status
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    search_url: row.get(1)?,
                    config_hash: row.get(2)?,
                    started_at: row.get(3)?,
                    finished_at: row.get(4)?,
                    status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                        .unwrap_or(RunStatus::Running),
                })
            })
            .optional()?;

        Ok(run)
    }
}

fn parse_timestamp(url: &str, field: &str, raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Corrupt(format!("{} of {}: {}", field, url, e)))
}

impl OfferStore for SqliteStore {
    // ===== Record Management =====

    fn load_offers(&self) -> StorageResult<HashMap<String, OfferRecord>> {
        let mut attributes: HashMap<String, OfferAttributes> = HashMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT offer_url, name, value FROM offer_attributes")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            for row in rows {
                let (url, name, value) = row?;
                attributes.entry(url).or_default().insert(name, value);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT url, first_seen, last_seen, is_active, origin_search FROM offers",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut offers = HashMap::new();
        for row in rows {
            let (url, first_seen, last_seen, is_active, origin_search) = row?;
            let record = OfferRecord {
                first_seen: parse_timestamp(&url, "first_seen", &first_seen)?,
                last_seen: parse_timestamp(&url, "last_seen", &last_seen)?,
                is_active,
                origin_search,
                attributes: attributes.remove(&url).unwrap_or_default(),
                url: url.clone(),
            };
            offers.insert(url, record);
        }

        Ok(offers)
    }

    fn save_offers(&mut self, offers: &HashMap<String, OfferRecord>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            // first_seen sticks on conflict; attribute rows are write-once
            let mut upsert = tx.prepare_cached(
                "INSERT INTO offers (url, first_seen, last_seen, is_active, origin_search)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(url) DO UPDATE SET
                     last_seen = excluded.last_seen,
                     is_active = excluded.is_active",
            )?;
            let mut insert_attr = tx.prepare_cached(
                "INSERT OR IGNORE INTO offer_attributes (offer_url, name, value)
                 VALUES (?1, ?2, ?3)",
            )?;

            for record in offers.values() {
                upsert.execute(params![
                    record.url,
                    record.first_seen.to_rfc3339(),
                    record.last_seen.to_rfc3339(),
                    record.is_active,
                    record.origin_search
                ])?;
                for (name, value) in &record.attributes {
                    insert_attr.execute(params![record.url, name, value])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ===== Run Management =====

    fn create_run(&mut self, search_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (search_url, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![search_url, config_hash, now, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &UpdateStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, new_offers = ?3,
             updated_offers = ?4, inactive_offers = ?5, failed_fetches = ?6
             WHERE id = ?7",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.new_offers as i64,
                stats.updated_offers as i64,
                stats.inactive_offers as i64,
                stats.failed_fetches as i64,
                run_id
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, error_message = ?3 WHERE id = ?4",
            params![RunStatus::Failed.to_db_string(), now, message, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Statistics =====

    fn store_stats(&self) -> StorageResult<StoreStats> {
        let (total, active): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM offers",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let searches: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT origin_search) FROM offers",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total_offers: total as u64,
            active_offers: active as u64,
            inactive_offers: (total - active) as u64,
            tracked_searches: searches as u64,
        })
    }
}
