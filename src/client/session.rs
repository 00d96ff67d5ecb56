//! HTTP session implementation
//!
//! This module handles every request the crawler issues, including:
//! - Building the HTTP client with the session's user agent and cookie
//! - Enforcing a per-fetch timeout
//! - Spacing consecutive requests by the configured delay
//! - Error classification

use crate::client::{FetchError, PageSource};
use crate::config::ClientConfig;
use crate::{ConfigError, HarvestError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetch session configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(HarvestError)` - The cookie is not a valid header value or the client failed to build
///
/// # Example
///
/// ```no_run
/// use listing_harvester::config::ClientConfig;
/// use listing_harvester::client::build_http_client;
///
/// let config = ClientConfig {
///     base_url: "https://www.avito.ru".to_string(),
///     user_agent: "Mozilla/5.0".to_string(),
///     cookie: None,
///     timeout_secs: 30,
///     request_delay_ms: 500,
///     index_retries: 2,
///     retry_backoff_ms: 1000,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/html;q=0.9, */*;q=0.8"),
    );

    if let Some(cookie) = &config.cookie {
        let value = HeaderValue::from_str(cookie).map_err(|e| {
            ConfigError::Validation(format!("cookie is not a valid header value: {}", e))
        })?;
        headers.insert(COOKIE, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// The single fetch session shared by index and detail requests
///
/// Requests are serialized: the session lock is held for the whole request,
/// so at most one request is in flight at any time.
pub struct HttpSession {
    client: Client,
    request_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HttpSession {
    /// Creates a session from configuration
    pub fn new(config: &ClientConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
            request_delay: Duration::from_millis(config.request_delay_ms),
            last_request: Mutex::new(None),
        })
    }
}

#[async_trait]
impl PageSource for HttpSession {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }

        tracing::debug!("GET {}", url);
        let sent = self.client.get(url.clone()).send().await;
        *last_request = Some(Instant::now());

        let response = sent.map_err(classify_error)?;
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(classify_error)
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else if error.is_body() || error.is_decode() {
        FetchError::Body(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}
