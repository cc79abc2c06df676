//! Offer lifecycle core
//!
//! This module owns the update pass: paging through search results,
//! reconciling observed listing URLs against the persisted record set,
//! fetching details for unknown listings through a bounded worker pool, and
//! merging everything back with first-seen/last-seen/active semantics.

pub mod pager;
pub mod pool;
pub mod reconcile;
pub mod tracker;

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;

/// Open mapping of scraped field name to value
///
/// The detail page decides which fields exist; the tracker never interprets
/// them, it only stores them once at record creation.
pub type OfferAttributes = BTreeMap<String, String>;

/// One persisted row per unique listing
///
/// The listing URL is the identity. A listing that disappears and is posted
/// again gets a fresh URL from the site, so it becomes a brand-new record;
/// `is_active` never goes back from false to true on an existing record.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferRecord {
    /// Canonical listing URL, the primary key
    pub url: String,

    /// Set exactly once, when the record is created
    pub first_seen: DateTime<Utc>,

    /// Bumped on every pass in which the listing appears in search results
    pub last_seen: DateTime<Utc>,

    /// True while the listing keeps appearing in passes
    pub is_active: bool,

    /// The search that produced this listing
    pub origin_search: String,

    /// Scraped detail fields, write-once at creation
    pub attributes: OfferAttributes,
}

impl OfferRecord {
    /// Creates a fresh active record for a listing first seen now
    pub fn new(
        url: String,
        origin_search: String,
        attributes: OfferAttributes,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            url,
            first_seen: seen_at,
            last_seen: seen_at,
            is_active: true,
            origin_search,
            attributes,
        }
    }
}

/// Summary of one update pass
#[derive(Debug, Clone)]
pub struct UpdateStats {
    /// Listings found in this pass's search results (after dedup)
    pub total_found: usize,

    /// Records created this pass
    pub new_offers: usize,

    /// Existing records whose `last_seen` was bumped
    pub updated_offers: usize,

    /// Records flipped to inactive this pass
    pub inactive_offers: usize,

    /// New listings whose detail fetch or parse failed (retried next run)
    pub failed_fetches: usize,

    /// Active records in the store after the merge
    pub total_active: usize,

    /// Wall-clock duration of the pass
    pub duration: Duration,
}
