//! HTTP fetching primitive
//!
//! This module handles all HTTP requests for the tracker, including:
//! - Building the shared HTTP client with timeouts
//! - Rotating browser user-agent strings across requests
//! - Retrying transient failures with a different agent
//! - Error classification into transport vs HTTP-status failures

use crate::config::UserAgentConfig;
use crate::RadarError;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Number of attempts per page, each with a freshly rotated user agent
const MAX_FETCH_ATTEMPTS: usize = 3;

/// Round-robin pool of user-agent strings
///
/// The listings site throttles repeated identical agents, so every request
/// picks the next agent from the pool. The pool is explicit shared state
/// handed to each caller rather than a process-wide rotation.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    cursor: AtomicUsize,
}

impl UserAgentPool {
    /// Creates a pool from the configured agent list
    ///
    /// The config validator guarantees the list is non-empty.
    pub fn new(config: &UserAgentConfig) -> Self {
        Self {
            agents: config.agents.clone(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next agent in rotation
    pub fn next_agent(&self) -> &str {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.agents[idx % self.agents.len()]
    }

    /// Number of distinct agents in the pool
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the pool has no agents (never true for validated configs)
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Builds the HTTP client shared by all fetches
///
/// The user agent is set per request from the rotation pool, so the client
/// itself carries no identity.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page body, rotating user agents across retries
///
/// Up to [`MAX_FETCH_ATTEMPTS`] attempts are made; each attempt uses the next
/// agent from the pool, mirroring how the site tolerates a fresh identity
/// after rejecting one. The last failure is returned if all attempts fail.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `agents` - User-agent rotation pool
/// * `url` - The URL to fetch
///
/// # Returns
///
/// * `Ok(String)` - The response body
/// * `Err(RadarError)` - Transport or HTTP-status failure after all attempts
pub async fn fetch_page(client: &Client, agents: &UserAgentPool, url: &str) -> crate::Result<String> {
    let mut last_error = RadarError::HttpStatus {
        url: url.to_string(),
        status: 0,
    };

    for attempt in 1..=MAX_FETCH_ATTEMPTS {
        let agent = agents.next_agent();
        match client.get(url).header(USER_AGENT, agent).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.text().await.map_err(|e| RadarError::Transport {
                        url: url.to_string(),
                        source: e,
                    });
                }

                tracing::warn!(
                    "HTTP {} for {} (attempt {}/{})",
                    status.as_u16(),
                    url,
                    attempt,
                    MAX_FETCH_ATTEMPTS
                );
                last_error = RadarError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                };

                // Client errors other than throttling will not improve with
                // a different agent
                if status.is_client_error() && status.as_u16() != 429 {
                    return Err(last_error);
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Request error for {} (attempt {}/{}): {}",
                    url,
                    attempt,
                    MAX_FETCH_ATTEMPTS,
                    e
                );
                last_error = RadarError::Transport {
                    url: url.to_string(),
                    source: e,
                };
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_agents() -> UserAgentConfig {
        UserAgentConfig {
            agents: vec![
                "AgentA/1.0".to_string(),
                "AgentB/1.0".to_string(),
                "AgentC/1.0".to_string(),
            ],
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client();
        assert!(client.is_ok());
    }

    #[test]
    fn test_agent_rotation_cycles() {
        let pool = UserAgentPool::new(&create_test_agents());

        assert_eq!(pool.next_agent(), "AgentA/1.0");
        assert_eq!(pool.next_agent(), "AgentB/1.0");
        assert_eq!(pool.next_agent(), "AgentC/1.0");
        assert_eq!(pool.next_agent(), "AgentA/1.0");
    }

    #[test]
    fn test_pool_len() {
        let pool = UserAgentPool::new(&create_test_agents());
        assert_eq!(pool.len(), 3);
        assert!(!pool.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_page_success() {
        use wiremock::matchers::{header_exists, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let pool = UserAgentPool::new(&create_test_agents());

        let body = fetch_page(&client, &pool, &format!("{}/page", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_fetch_page_404_fails_without_retry() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let pool = UserAgentPool::new(&create_test_agents());

        let result = fetch_page(&client, &pool, &format!("{}/missing", server.uri())).await;
        assert!(matches!(
            result,
            Err(RadarError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_retries_server_errors() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = build_http_client().unwrap();
        let pool = UserAgentPool::new(&create_test_agents());

        let result = fetch_page(&client, &pool, &format!("{}/flaky", server.uri())).await;
        assert!(matches!(
            result,
            Err(RadarError::HttpStatus { status: 500, .. })
        ));
    }
}
