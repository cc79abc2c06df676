//! Bounded worker pool for detail fetches
//!
//! New listings are fetched by a fixed number of workers pulling from a
//! shared queue. Each worker handles one listing at a time and pauses before
//! every request, so the effective request rate is `workers / pause` and
//! callers size both together. A failed fetch is logged and recorded as a
//! skip; it never aborts the other workers. The pool drains completely
//! before returning, so the caller merges a finished mapping, never a stream.

use crate::offers::OfferAttributes;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of draining one batch of detail fetches
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Successfully fetched attribute mappings, keyed by listing URL
    pub fetched: HashMap<String, OfferAttributes>,

    /// Listings whose fetch or parse failed; they stay absent from the store
    /// this pass and come back as "new" on the next run
    pub failed: Vec<String>,
}

/// Fetches details for a batch of listing URLs with bounded concurrency
///
/// Every URL in `ids` is attempted exactly once. Completion order is
/// unspecified; the returned mapping is order-independent.
///
/// # Arguments
///
/// * `ids` - Listing URLs to fetch
/// * `workers` - Number of concurrent workers (>= 1)
/// * `pause` - Pause each worker takes before issuing a request
/// * `fetch` - Per-URL fetch function; an `Err` is a skip, not an abort
pub async fn fetch_all<F, Fut>(
    ids: Vec<String>,
    workers: usize,
    pause: Duration,
    fetch: F,
) -> FetchOutcome
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = crate::Result<OfferAttributes>> + Send,
{
    let mut outcome = FetchOutcome::default();
    if ids.is_empty() {
        return outcome;
    }

    let total = ids.len();
    let worker_count = workers.max(1).min(total);
    let queue = Arc::new(Mutex::new(ids.into_iter().collect::<VecDeque<_>>()));
    let fetch = Arc::new(fetch);
    let (tx, mut rx) = mpsc::channel::<(String, Option<OfferAttributes>)>(total);

    let mut handles = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        let queue = Arc::clone(&queue);
        let fetch = Arc::clone(&fetch);
        let tx = tx.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let url = {
                    let mut queue = queue.lock().expect("fetch queue poisoned");
                    queue.pop_front()
                };
                let Some(url) = url else {
                    break;
                };

                tokio::time::sleep(pause).await;

                let result = match fetch(url.clone()).await {
                    Ok(attributes) => Some(attributes),
                    Err(e) => {
                        tracing::warn!("Worker {}: skipping {}: {}", worker_id, url, e);
                        None
                    }
                };

                if tx.send((url, result)).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    // The channel closes once every worker has drained its share, so this
    // loop ends exactly when the whole batch has been attempted
    while let Some((url, result)) = rx.recv().await {
        match result {
            Some(attributes) => {
                outcome.fetched.insert(url, attributes);
            }
            None => outcome.failed.push(url),
        }
    }

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Fetch worker panicked: {}", e);
        }
    }

    tracing::info!(
        "Detail fetch batch done: {} fetched, {} failed of {}",
        outcome.fetched.len(),
        outcome.failed.len(),
        total
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RadarError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://example.com/offer/{}", i)).collect()
    }

    fn attrs_for(url: &str) -> OfferAttributes {
        let mut attrs = OfferAttributes::new();
        attrs.insert("title".to_string(), url.to_string());
        attrs
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = fetch_all(vec![], 4, Duration::ZERO, |url: String| async move {
            Ok(attrs_for(&url))
        })
        .await;

        assert!(outcome.fetched.is_empty());
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_every_url_attempted_exactly_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let outcome = fetch_all(urls(10), 3, Duration::ZERO, move |url: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(attrs_for(&url))
            }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 10);
        assert_eq!(outcome.fetched.len(), 10);
        assert!(outcome.failed.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let outcome = fetch_all(urls(5), 2, Duration::ZERO, |url: String| async move {
            if url.ends_with("/3") {
                Err(RadarError::DetailParse {
                    url,
                    message: "broken page".to_string(),
                })
            } else {
                Ok(attrs_for(&url))
            }
        })
        .await;

        assert_eq!(outcome.fetched.len(), 4);
        assert_eq!(outcome.failed, vec!["https://example.com/offer/3"]);
        assert!(!outcome.fetched.contains_key("https://example.com/offer/3"));
    }

    #[tokio::test]
    async fn test_more_workers_than_urls() {
        let outcome = fetch_all(urls(2), 16, Duration::ZERO, |url: String| async move {
            Ok(attrs_for(&url))
        })
        .await;

        assert_eq!(outcome.fetched.len(), 2);
    }

    #[tokio::test]
    async fn test_single_worker_processes_whole_batch() {
        let outcome = fetch_all(urls(6), 1, Duration::ZERO, |url: String| async move {
            Ok(attrs_for(&url))
        })
        .await;

        assert_eq!(outcome.fetched.len(), 6);
    }

    #[tokio::test]
    async fn test_all_failures_still_drain() {
        let outcome = fetch_all(urls(4), 2, Duration::ZERO, |url: String| async move {
            Err(RadarError::DetailParse {
                url,
                message: "down".to_string(),
            })
        })
        .await;

        assert!(outcome.fetched.is_empty());
        assert_eq!(outcome.failed.len(), 4);
    }
}
