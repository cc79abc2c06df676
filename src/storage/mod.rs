//! Storage module for persisting tracked listings
//!
//! This module handles all database operations for the tracker, including:
//! - SQLite database initialization and schema management
//! - Offer record and attribute persistence
//! - Run tracking for update passes
//! - Aggregate statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{OfferStore, StorageError, StorageResult};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Represents one update pass in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub search_url: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
}

/// Status of an update pass
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

/// Aggregate counts over the whole store
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub total_offers: u64,
    pub active_offers: u64,
    pub inactive_offers: u64,
    pub tracked_searches: u64,
}
