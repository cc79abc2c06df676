//! Search pager
//!
//! Walks the paginated search results from page 1 and accumulates every
//! listing URL the search currently returns. Each invocation re-walks from
//! the start; there is no cursor to resume.

use crate::scrape::{extract_offer_links, page_url};
use std::future::Future;
use url::Url;

/// Result of walking one search's result pages
#[derive(Debug, Default)]
pub struct PageWalk {
    /// Listing URLs observed, in page order, duplicates included
    pub ids: Vec<String>,

    /// Pages fetched successfully; zero means the search surface was
    /// unreachable and the caller must treat the pass as failed
    pub pages_fetched: u32,
}

/// Walks search-result pages until exhaustion
///
/// Stops when a page yields zero listings, when `max_pages` is reached
/// (guard against malformed pagination looping forever), or when a page
/// fetch fails. A mid-walk failure is logged and treated as end-of-pages:
/// a partial pass is preferred over aborting the run, since the next pass
/// re-walks everything anyway.
///
/// # Arguments
///
/// * `search_url` - The saved search URL
/// * `max_pages` - Upper bound on pages walked in one pass
/// * `fetch` - Page-fetch function returning the raw page body
pub async fn walk_search<F, Fut>(
    search_url: &str,
    max_pages: u32,
    fetch: F,
) -> crate::Result<PageWalk>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = crate::Result<String>>,
{
    let base = Url::parse(search_url)?;
    let mut walk = PageWalk::default();

    for page in 1..=max_pages {
        let url = page_url(search_url, page);
        tracing::debug!("Fetching search page {}: {}", page, url);

        let body = match fetch(url.clone()).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    "Search page {} failed, treating as end of results: {}",
                    page,
                    e
                );
                break;
            }
        };
        walk.pages_fetched += 1;

        let links = extract_offer_links(&body, &base);
        if links.is_empty() {
            tracing::debug!("Search page {} has no listings, stopping", page);
            break;
        }

        tracing::info!("Search page {}: {} listings", page, links.len());
        walk.ids.extend(links);
    }

    if walk.pages_fetched == max_pages {
        tracing::warn!(
            "Stopped at the {}-page guard; the search may have more results",
            max_pages
        );
    }

    Ok(walk)
}
