//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::offers::{OfferRecord, UpdateStats};
use crate::storage::StoreStats;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The tracker works on a full in-memory snapshot: it loads every record at
/// the start of a pass and writes the merged set back at the end, so the
/// interface is deliberately coarse.
pub trait OfferStore {
    // ===== Record Management =====

    /// Loads every persisted record, keyed by listing URL
    fn load_offers(&self) -> StorageResult<HashMap<String, OfferRecord>>;

    /// Persists the full record set in a single transaction
    ///
    /// Existing rows keep their `first_seen`; attribute rows are write-once
    /// and never overwritten by later saves.
    fn save_offers(&mut self, offers: &HashMap<String, OfferRecord>) -> StorageResult<()>;

    // ===== Run Management =====

    /// Records the start of an update pass
    ///
    /// # Arguments
    ///
    /// * `search_url` - The search this pass walks
    /// * `config_hash` - Hash of the configuration in effect
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, search_url: &str, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed and records its pass counts
    fn complete_run(&mut self, run_id: i64, stats: &UpdateStats) -> StorageResult<()>;

    /// Marks a run as failed with an error message
    fn fail_run(&mut self, run_id: i64, message: &str) -> StorageResult<()>;

    // ===== Statistics =====

    /// Aggregate counts over the whole store, for the `stats` command
    fn store_stats(&self) -> StorageResult<StoreStats>;
}
