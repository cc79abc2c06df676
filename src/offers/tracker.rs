//! Update-pass orchestrator
//!
//! The tracker sequences one pass: load the store snapshot, walk the search
//! pages, reconcile, fetch details for unknown listings through the worker
//! pool, merge, persist. Every stage is a hard sequence point; the record
//! map is only ever touched by this single task, after the pool has fully
//! drained, so no locking is needed around it.

use crate::config::{Config, ScraperConfig};
use crate::offers::reconcile::{reconcile, ReconcileOutcome};
use crate::offers::{pager, pool, OfferRecord, UpdateStats};
use crate::scrape::{build_http_client, fetch_page, parse_offer_details, UserAgentPool};
use crate::storage::{OfferStore, StoreStats};
use crate::RadarError;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::collections::{hash_map::Entry, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Drives update passes against one persistent store
pub struct OfferTracker<S: OfferStore> {
    store: S,
    client: Client,
    agents: Arc<UserAgentPool>,
    scraper: ScraperConfig,
    config_hash: String,
}

impl<S: OfferStore> OfferTracker<S> {
    /// Creates a tracker from a store and configuration
    ///
    /// # Arguments
    ///
    /// * `store` - The persistence backend
    /// * `config` - Validated configuration
    /// * `config_hash` - Hash recorded on run rows for traceability
    pub fn new(store: S, config: &Config, config_hash: impl Into<String>) -> crate::Result<Self> {
        let client = build_http_client()?;
        let agents = Arc::new(UserAgentPool::new(&config.user_agent));

        Ok(Self {
            store,
            client,
            agents,
            scraper: config.scraper.clone(),
            config_hash: config_hash.into(),
        })
    }

    /// Runs one update pass for a search
    ///
    /// # Stages
    ///
    /// 1. Load the store snapshot.
    /// 2. Walk the search pages to collect the current listing URLs.
    /// 3. Reconcile them against the snapshot.
    /// 4. Fetch details for unknown listings (bounded pool, full drain).
    /// 5. Merge: bump `last_seen` on sighted records, deactivate absent
    ///    ones, create records for fetched listings.
    /// 6. Persist the merged set in one transaction and return counts.
    ///
    /// A pass in which no search page could be fetched fails with
    /// [`RadarError::EmptySearch`] before any record is touched, so a site
    /// outage never reads as every listing disappearing at once.
    pub async fn update(&mut self, search_url: &str) -> crate::Result<UpdateStats> {
        let started = Instant::now();
        tracing::info!("Starting update pass for {}", search_url);

        let mut offers = self.store.load_offers()?;
        tracing::info!("Store snapshot: {} records", offers.len());

        let run_id = self.store.create_run(search_url, &self.config_hash)?;

        let walk = {
            let client = self.client.clone();
            let agents = Arc::clone(&self.agents);
            let fetch = move |url: String| {
                let client = client.clone();
                let agents = Arc::clone(&agents);
                async move { fetch_page(&client, &agents, &url).await }
            };
            pager::walk_search(search_url, self.scraper.max_pages, fetch).await
        };

        let walk = match walk {
            Ok(walk) if walk.pages_fetched == 0 => {
                let err = RadarError::EmptySearch {
                    search_url: search_url.to_string(),
                };
                self.store.fail_run(run_id, &err.to_string())?;
                return Err(err);
            }
            Ok(walk) => walk,
            Err(e) => {
                self.store.fail_run(run_id, &e.to_string())?;
                return Err(e);
            }
        };

        let current_ids: HashSet<String> = walk.ids.into_iter().collect();
        tracing::info!(
            "Search returned {} unique listings across {} pages",
            current_ids.len(),
            walk.pages_fetched
        );

        let outcome = reconcile(&current_ids, &offers);
        tracing::info!(
            "Reconciled: {} to fetch, {} known, {} to deactivate",
            outcome.to_fetch.len(),
            outcome.to_touch.len(),
            outcome.to_deactivate.len()
        );

        let fetched = {
            let client = self.client.clone();
            let agents = Arc::clone(&self.agents);
            let fetch = move |url: String| {
                let client = client.clone();
                let agents = Arc::clone(&agents);
                async move {
                    let html = fetch_page(&client, &agents, &url).await?;
                    parse_offer_details(&html, &url)
                }
            };
            pool::fetch_all(
                outcome.to_fetch.iter().cloned().collect(),
                self.scraper.workers as usize,
                Duration::from_millis(self.scraper.pause_ms),
                fetch,
            )
            .await
        };

        let now = Utc::now();
        let (new_offers, updated_offers, inactive_offers) =
            merge_pass(&mut offers, &outcome, fetched.fetched, search_url, now);

        let total_active = offers.values().filter(|r| r.is_active).count();
        if let Err(e) = self.store.save_offers(&offers) {
            // Best effort; the save error is the one worth surfacing
            let _ = self.store.fail_run(run_id, &e.to_string());
            return Err(e.into());
        }

        let stats = UpdateStats {
            total_found: current_ids.len(),
            new_offers,
            updated_offers,
            inactive_offers,
            failed_fetches: fetched.failed.len(),
            total_active,
            duration: started.elapsed(),
        };
        self.store.complete_run(run_id, &stats)?;

        tracing::info!(
            "Update pass finished in {:.1}s: {} new, {} updated, {} inactive, {} failed",
            stats.duration.as_secs_f64(),
            stats.new_offers,
            stats.updated_offers,
            stats.inactive_offers,
            stats.failed_fetches
        );

        Ok(stats)
    }

    /// Current store statistics, for the `stats` command
    pub fn store_stats(&self) -> crate::Result<StoreStats> {
        Ok(self.store.store_stats()?)
    }
}

/// Applies one reconciled pass to the in-memory record set
///
/// Sighted records get `last_seen` bumped; a record that was already
/// deactivated stays inactive even if its URL shows up again (a relisted
/// vehicle carries a new URL, so reappearance of an old one is noise, not a
/// revival). Absent active records flip to inactive with `last_seen`
/// untouched. Fetched listings become fresh records; an existing record is
/// never overwritten.
///
/// Returns `(new, updated, inactive)` counts.
fn merge_pass(
    offers: &mut HashMap<String, OfferRecord>,
    outcome: &ReconcileOutcome,
    fetched: HashMap<String, crate::offers::OfferAttributes>,
    search_url: &str,
    now: DateTime<Utc>,
) -> (usize, usize, usize) {
    for id in &outcome.to_touch {
        if let Some(record) = offers.get_mut(id) {
            record.last_seen = now;
            if !record.is_active {
                tracing::debug!("Inactive record {} sighted again; leaving it inactive", id);
            }
        }
    }

    for id in &outcome.to_deactivate {
        if let Some(record) = offers.get_mut(id) {
            record.is_active = false;
            tracing::debug!("Deactivated {}", id);
        }
    }

    let mut new_offers = 0;
    for (url, attributes) in fetched {
        match offers.entry(url) {
            Entry::Vacant(slot) => {
                let record = OfferRecord::new(
                    slot.key().clone(),
                    search_url.to_string(),
                    attributes,
                    now,
                );
                slot.insert(record);
                new_offers += 1;
            }
            Entry::Occupied(slot) => {
                // to_fetch is disjoint from the store keys by construction;
                // never clobber an existing record's history
                tracing::warn!(
                    "Fetched detail for already-known listing {}, ignoring",
                    slot.key()
                );
            }
        }
    }

    (new_offers, outcome.to_touch.len(), outcome.to_deactivate.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers::OfferAttributes;
    use crate::storage::{StorageError, StorageResult};
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(url: &str, active: bool, seen: DateTime<Utc>) -> OfferRecord {
        let mut r = OfferRecord::new(
            url.to_string(),
            "https://example.com/search".to_string(),
            OfferAttributes::new(),
            seen,
        );
        r.is_active = active;
        r
    }

    fn ids(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_merge_touch_bumps_last_seen_only() {
        let old = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let mut offers = HashMap::new();
        offers.insert("a".to_string(), record("a", true, old));

        let outcome = ReconcileOutcome {
            to_touch: ids(&["a"]),
            ..Default::default()
        };
        let (new, updated, inactive) =
            merge_pass(&mut offers, &outcome, HashMap::new(), "search", now);

        assert_eq!((new, updated, inactive), (0, 1, 0));
        let rec = &offers["a"];
        assert_eq!(rec.last_seen, now);
        assert_eq!(rec.first_seen, old);
        assert!(rec.is_active);
    }

    #[test]
    fn test_merge_never_reactivates() {
        let old = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let mut offers = HashMap::new();
        offers.insert("zombie".to_string(), record("zombie", false, old));

        let outcome = ReconcileOutcome {
            to_touch: ids(&["zombie"]),
            ..Default::default()
        };
        merge_pass(&mut offers, &outcome, HashMap::new(), "search", now);

        let rec = &offers["zombie"];
        assert!(!rec.is_active, "deactivation must be terminal");
        assert_eq!(rec.last_seen, now);
    }

    #[test]
    fn test_merge_deactivates_without_bumping_last_seen() {
        let old = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let mut offers = HashMap::new();
        offers.insert("gone".to_string(), record("gone", true, old));

        let outcome = ReconcileOutcome {
            to_deactivate: ids(&["gone"]),
            ..Default::default()
        };
        let (_, _, inactive) = merge_pass(&mut offers, &outcome, HashMap::new(), "search", now);

        assert_eq!(inactive, 1);
        let rec = &offers["gone"];
        assert!(!rec.is_active);
        assert_eq!(rec.last_seen, old, "absence must not move last_seen");
    }

    #[test]
    fn test_merge_creates_records_for_fetched() {
        let now = Utc::now();
        let mut offers = HashMap::new();
        let mut fetched = HashMap::new();
        let mut attrs = OfferAttributes::new();
        attrs.insert("title".to_string(), "Car".to_string());
        fetched.insert("https://example.com/offer/1".to_string(), attrs);

        let outcome = ReconcileOutcome::default();
        let (new, _, _) = merge_pass(&mut offers, &outcome, fetched, "the-search", now);

        assert_eq!(new, 1);
        let rec = &offers["https://example.com/offer/1"];
        assert!(rec.is_active);
        assert_eq!(rec.first_seen, now);
        assert_eq!(rec.origin_search, "the-search");
        assert_eq!(rec.attributes.get("title").unwrap(), "Car");
    }

    /// Run-row bookkeeping recorded by [`SaveFailStore`]
    #[derive(Default)]
    struct RunLog {
        completed: Vec<i64>,
        failed: Vec<i64>,
    }

    /// Store double whose save always fails, for the persistence error path
    struct SaveFailStore {
        log: Arc<Mutex<RunLog>>,
    }

    impl OfferStore for SaveFailStore {
        fn load_offers(&self) -> StorageResult<HashMap<String, OfferRecord>> {
            Ok(HashMap::new())
        }

        fn save_offers(&mut self, _offers: &HashMap<String, OfferRecord>) -> StorageResult<()> {
            Err(StorageError::Corrupt("disk full".to_string()))
        }

        fn create_run(&mut self, _search_url: &str, _config_hash: &str) -> StorageResult<i64> {
            Ok(7)
        }

        fn complete_run(
            &mut self,
            run_id: i64,
            _stats: &UpdateStats,
        ) -> StorageResult<()> {
            self.log.lock().unwrap().completed.push(run_id);
            Ok(())
        }

        fn fail_run(&mut self, run_id: i64, _message: &str) -> StorageResult<()> {
            self.log.lock().unwrap().failed.push(run_id);
            Ok(())
        }

        fn store_stats(&self) -> StorageResult<crate::storage::StoreStats> {
            Ok(crate::storage::StoreStats::default())
        }
    }

    #[tokio::test]
    async fn test_failed_save_marks_run_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><div data-testid="search-results"></div></body></html>"#,
            ))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.scraper.workers = 1;
        config.scraper.pause_ms = 0;

        let log = Arc::new(Mutex::new(RunLog::default()));
        let store = SaveFailStore {
            log: Arc::clone(&log),
        };
        let mut tracker = OfferTracker::new(store, &config, "test-hash").unwrap();

        let result = tracker
            .update(&format!("{}/search?brand=x", server.uri()))
            .await;

        assert!(matches!(result, Err(RadarError::Storage(_))));
        let log = log.lock().unwrap();
        assert_eq!(log.failed, vec![7], "run must not be left in running status");
        assert!(log.completed.is_empty());
    }

    #[test]
    fn test_merge_never_clobbers_existing_record() {
        let old = Utc::now() - chrono::Duration::days(3);
        let now = Utc::now();
        let mut offers = HashMap::new();
        let mut original = record("a", true, old);
        original
            .attributes
            .insert("title".to_string(), "Original".to_string());
        offers.insert("a".to_string(), original);

        let mut fetched = HashMap::new();
        let mut attrs = OfferAttributes::new();
        attrs.insert("title".to_string(), "Imposter".to_string());
        fetched.insert("a".to_string(), attrs);

        let (new, _, _) = merge_pass(
            &mut offers,
            &ReconcileOutcome::default(),
            fetched,
            "search",
            now,
        );

        assert_eq!(new, 0);
        assert_eq!(offers["a"].attributes.get("title").unwrap(), "Original");
        assert_eq!(offers["a"].first_seen, old);
    }
}
