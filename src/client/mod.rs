//! Fetch capability used by the crawler
//!
//! Everything the crawler reads, index pages and detail pages alike, goes
//! through one `PageSource`. The production implementation is `HttpSession`;
//! tests substitute in-memory sources.

mod session;

pub use session::{build_http_client, HttpSession};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failure to obtain the raw content of a URL
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// Fetches raw page content (HTML or JSON-as-text) for a URL
///
/// Implementations perform no retries of their own.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}
