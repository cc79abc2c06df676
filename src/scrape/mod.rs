//! Site scraping collaborators
//!
//! This module contains the pieces that talk to the listings site:
//! - HTTP fetching with user-agent rotation and retry
//! - Search-results parsing (listing links, pagination URLs)
//! - Detail-page parsing into the open attribute mapping
//!
//! The lifecycle core in [`crate::offers`] only sees these through fetch
//! closures and parse functions, so tests can substitute canned content.

mod detail;
mod fetch;
mod search;

pub use detail::parse_offer_details;
pub use fetch::{build_http_client, fetch_page, UserAgentPool};
pub use search::{extract_offer_links, page_url};
