//! Search-results page parsing
//!
//! This module extracts listing URLs from a page of search results and
//! builds the paginated URLs the pager walks through.

use scraper::{Html, Selector};
use url::Url;

/// Extracts listing URLs from a search-results page
///
/// # Extraction rules
///
/// Each result is an `<article>` inside the `search-results` container.
/// Featured-dealer placements are advertising slots, not search results, and
/// are skipped. The listing link is the first anchor inside the article's
/// `<section>` element, resolved against `base` so relative hrefs come back
/// absolute. Only http(s) URLs are kept.
///
/// # Arguments
///
/// * `html` - The search-results page body
/// * `base` - The page's own URL, for resolving relative links
///
/// # Returns
///
/// The listing URLs found, in page order. Empty when the page has no results
/// section or no articles (the pager treats that as end-of-pages).
pub fn extract_offer_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let article_selector = match Selector::parse(r#"div[data-testid="search-results"] article"#) {
        Ok(s) => s,
        Err(_) => return links,
    };
    let anchor_selector = match Selector::parse("section a[href]") {
        Ok(s) => s,
        Err(_) => return links,
    };

    for article in document.select(&article_selector) {
        if article
            .value()
            .attr("data-testid")
            .is_some_and(|t| t.contains("featured-dealer"))
        {
            continue;
        }

        let Some(anchor) = article.select(&anchor_selector).next() else {
            tracing::debug!("Search result article without a listing link, skipping");
            continue;
        };

        if let Some(href) = anchor.value().attr("href") {
            if let Some(absolute) = resolve_link(href, base) {
                links.push(absolute);
            }
        }
    }

    links
}

/// Resolves a listing href to an absolute http(s) URL
fn resolve_link(href: &str, base: &Url) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    match base.join(href) {
        Ok(absolute) => {
            if absolute.scheme() == "http" || absolute.scheme() == "https" {
                Some(absolute.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

/// Builds the URL for one page of a search
///
/// Any `page=` parameter already on the search URL is dropped first, so a URL
/// copied from the middle of a paginated session still walks from the page
/// the caller asks for.
///
/// # Example
///
/// ```
/// use offer_radar::scrape::page_url;
///
/// assert_eq!(
///     page_url("https://example.com/search?brand=x", 3),
///     "https://example.com/search?brand=x&page=3"
/// );
/// ```
pub fn page_url(search_url: &str, page: u32) -> String {
    let base = search_url
        .split("&page=")
        .next()
        .and_then(|s| s.split("?page=").next())
        .unwrap_or(search_url);

    if base.contains('?') {
        format!("{}&page={}", base, page)
    } else {
        format!("{}?page={}", base, page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/search").unwrap()
    }

    fn results_page(articles: &str) -> String {
        format!(
            r#"<html><body><div data-testid="search-results">{}</div></body></html>"#,
            articles
        )
    }

    #[test]
    fn test_extract_single_link() {
        let html = results_page(
            r#"<article><section><a href="/offer/1">Car</a></section></article>"#,
        );
        let links = extract_offer_links(&html, &base());
        assert_eq!(links, vec!["https://example.com/offer/1"]);
    }

    #[test]
    fn test_extract_multiple_links_in_order() {
        let html = results_page(
            r#"<article><section><a href="/offer/1">A</a></section></article>
               <article><section><a href="/offer/2">B</a></section></article>"#,
        );
        let links = extract_offer_links(&html, &base());
        assert_eq!(
            links,
            vec![
                "https://example.com/offer/1",
                "https://example.com/offer/2"
            ]
        );
    }

    #[test]
    fn test_skip_featured_dealer() {
        let html = results_page(
            r#"<article data-testid="featured-dealer-slot"><section><a href="/ad">Ad</a></section></article>
               <article><section><a href="/offer/1">Car</a></section></article>"#,
        );
        let links = extract_offer_links(&html, &base());
        assert_eq!(links, vec!["https://example.com/offer/1"]);
    }

    #[test]
    fn test_article_without_link_skipped() {
        let html = results_page(r#"<article><section><p>no link</p></section></article>"#);
        let links = extract_offer_links(&html, &base());
        assert!(links.is_empty());
    }

    #[test]
    fn test_no_results_container() {
        let html = "<html><body><p>maintenance</p></body></html>";
        let links = extract_offer_links(html, &base());
        assert!(links.is_empty());
    }

    #[test]
    fn test_absolute_link_kept_as_is() {
        let html = results_page(
            r#"<article><section><a href="https://other.example.com/offer/9">Car</a></section></article>"#,
        );
        let links = extract_offer_links(&html, &base());
        assert_eq!(links, vec!["https://other.example.com/offer/9"]);
    }

    #[test]
    fn test_page_url_without_query() {
        assert_eq!(
            page_url("https://example.com/search", 2),
            "https://example.com/search?page=2"
        );
    }

    #[test]
    fn test_page_url_with_query() {
        assert_eq!(
            page_url("https://example.com/search?brand=x", 2),
            "https://example.com/search?brand=x&page=2"
        );
    }

    #[test]
    fn test_page_url_replaces_existing_page_param() {
        assert_eq!(
            page_url("https://example.com/search?brand=x&page=7", 2),
            "https://example.com/search?brand=x&page=2"
        );
        assert_eq!(
            page_url("https://example.com/search?page=7", 2),
            "https://example.com/search?page=2"
        );
    }
}
