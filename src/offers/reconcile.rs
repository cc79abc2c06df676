//! Reconciliation of a search pass against the persisted record set
//!
//! This is a pure set computation: no I/O, deterministic, and the one place
//! where the new/touch/deactivate decision is made. The orchestrator applies
//! the outcome; nothing here mutates the store.

use crate::offers::OfferRecord;
use std::collections::{HashMap, HashSet};

/// Classification of identifiers for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// In the search results, not in the store: fetch details, create records
    pub to_fetch: HashSet<String>,

    /// In the search results and in the store: bump `last_seen`
    pub to_touch: HashSet<String>,

    /// In the store, active, and absent from the results: flip to inactive
    pub to_deactivate: HashSet<String>,
}

/// Classifies the identifiers of one pass against the store
///
/// - `to_fetch` = `current_ids` minus store keys
/// - `to_touch` = `current_ids` intersect store keys
/// - `to_deactivate` = store keys minus `current_ids`, restricted to records
///   that are still active, so re-running deactivation is a no-op
///
/// Duplicate sightings of one identifier within a pass (the same listing on
/// two result pages) collapse before this function via the `HashSet` input.
///
/// # Arguments
///
/// * `current_ids` - Identifiers observed in this pass's search results
/// * `store` - The persisted record set, keyed by identifier
pub fn reconcile(
    current_ids: &HashSet<String>,
    store: &HashMap<String, OfferRecord>,
) -> ReconcileOutcome {
    let mut outcome = ReconcileOutcome::default();

    for id in current_ids {
        if store.contains_key(id) {
            outcome.to_touch.insert(id.clone());
        } else {
            outcome.to_fetch.insert(id.clone());
        }
    }

    for (id, record) in store {
        if record.is_active && !current_ids.contains(id) {
            outcome.to_deactivate.insert(id.clone());
        }
    }

    outcome
}
