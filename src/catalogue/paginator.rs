//! Listing-index pagination
//!
//! Both index endpoints follow the same contract: request one batch at the
//! cursor, advance after a non-empty batch, stop at the first empty batch.
//! There is no page cap and no total-count check. The two modes differ only
//! in how the cursor moves and how a response is decoded:
//!
//! | Mode   | Cursor         | Start | Step | Batch location   |
//! |--------|----------------|-------|------|------------------|
//! | Search | `PageCursor`   | 1     | 1    | `catalog.items`  |
//! | Shop   | `OffsetCursor` | 0     | 100  | `result.list`    |

use crate::catalogue::model::{AdStub, StubKind};
use crate::client::{FetchError, PageSource};
use crate::config::ClientConfig;
use crate::url::{search_index_url, shop_index_url, SellerHash};
use crate::HarvestError;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Number of listings requested per shop index page
pub const SHOP_PAGE_SIZE: u32 = 100;

/// Reasons an index page could not be turned into a batch
#[derive(Debug, Error)]
pub enum PaginationFailure {
    #[error("index fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("index response is not valid JSON of the expected shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("index response is an HTML document without a <pre> payload")]
    MissingPayload,

    #[error("index entry {index} has no listing path")]
    MissingPath { index: usize },
}

/// Pagination state shared by both index modes
pub trait Cursor {
    /// Current page number or offset
    fn position(&self) -> u32;

    /// Moves past a non-empty batch
    fn advance(&mut self);

    /// Marks the index as exhausted
    fn finish(&mut self);

    fn is_done(&self) -> bool;
}

/// Page-number cursor used by search crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page_number: u32,
    done: bool,
}

impl PageCursor {
    pub fn new() -> Self {
        Self {
            page_number: 1,
            done: false,
        }
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl Cursor for PageCursor {
    fn position(&self) -> u32 {
        self.page_number
    }

    fn advance(&mut self) {
        self.page_number += 1;
    }

    fn finish(&mut self) {
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// Offset cursor used by shop crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetCursor {
    offset: u32,
    step: u32,
    done: bool,
}

impl OffsetCursor {
    pub fn new(step: u32) -> Self {
        Self {
            offset: 0,
            step,
            done: false,
        }
    }

    pub fn step(&self) -> u32 {
        self.step
    }
}

impl Cursor for OffsetCursor {
    fn position(&self) -> u32 {
        self.offset
    }

    fn advance(&mut self) {
        self.offset += self.step;
    }

    fn finish(&mut self) {
        self.done = true;
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// One index endpoint: how to address a page and how to read it
pub trait IndexMode {
    type Cursor: Cursor;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn index_url(&self, base: &Url, cursor: &Self::Cursor) -> Result<Url, url::ParseError>;

    /// Decodes a raw response into stubs, including entries that are not listings
    fn decode_batch(&self, body: &str) -> Result<Vec<AdStub>, PaginationFailure>;
}

/// Search endpoint parameterized by text and region
#[derive(Debug, Clone)]
pub struct SearchIndex {
    pub text: String,
    pub region_id: u32,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    catalog: SearchCatalog,
}

#[derive(Deserialize)]
struct SearchCatalog {
    items: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "urlPath", default)]
    url_path: Option<String>,
}

impl IndexMode for SearchIndex {
    type Cursor = PageCursor;

    fn name(&self) -> &'static str {
        "search"
    }

    fn index_url(&self, base: &Url, cursor: &PageCursor) -> Result<Url, url::ParseError> {
        search_index_url(base, &self.text, self.region_id, cursor.position())
    }

    fn decode_batch(&self, body: &str) -> Result<Vec<AdStub>, PaginationFailure> {
        let payload = json_payload(body)?;
        let envelope: SearchEnvelope = serde_json::from_str(&payload)?;

        envelope
            .catalog
            .items
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let kind = StubKind::from_index_type(entry.kind.as_deref().unwrap_or_default());
                match (kind, entry.url_path) {
                    (StubKind::Item, Some(url_path)) => Ok(AdStub { url_path, kind }),
                    (StubKind::Item, None) => Err(PaginationFailure::MissingPath { index }),
                    (StubKind::Other, url_path) => Ok(AdStub {
                        url_path: url_path.unwrap_or_default(),
                        kind,
                    }),
                }
            })
            .collect()
    }
}

/// Seller profile endpoint parameterized by seller hash
#[derive(Debug, Clone)]
pub struct ShopIndex {
    pub seller: SellerHash,
}

#[derive(Deserialize)]
struct ShopEnvelope {
    result: ShopResult,
}

#[derive(Deserialize)]
struct ShopResult {
    list: Vec<ShopEntry>,
}

#[derive(Deserialize)]
struct ShopEntry {
    #[serde(default)]
    url: Option<String>,
}

impl IndexMode for ShopIndex {
    type Cursor = OffsetCursor;

    fn name(&self) -> &'static str {
        "shop"
    }

    fn index_url(&self, base: &Url, cursor: &OffsetCursor) -> Result<Url, url::ParseError> {
        shop_index_url(base, &self.seller, cursor.position(), cursor.step())
    }

    fn decode_batch(&self, body: &str) -> Result<Vec<AdStub>, PaginationFailure> {
        let payload = json_payload(body)?;
        let envelope: ShopEnvelope = serde_json::from_str(&payload)?;

        envelope
            .result
            .list
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                entry
                    .url
                    .map(AdStub::item)
                    .ok_or(PaginationFailure::MissingPath { index })
            })
            .collect()
    }
}

/// Returns the JSON text of an index response
///
/// A browser-backed session renders JSON inside a `<pre>` element; a plain
/// HTTP session returns it as is.
fn json_payload(body: &str) -> Result<Cow<'_, str>, PaginationFailure> {
    let trimmed = body.trim_start();
    if !trimmed.starts_with('<') {
        return Ok(Cow::Borrowed(trimmed));
    }

    let document = Html::parse_document(body);
    Selector::parse("pre")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|pre| Cow::Owned(pre.text().collect::<String>()))
        })
        .ok_or(PaginationFailure::MissingPayload)
}

/// Bounded retry for index pages that fail to fetch or decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,

    /// Delay before retry `n` is `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            retries: config.index_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Listings of one non-empty index page
#[derive(Debug, Clone)]
pub struct IndexBatch {
    /// Page number or offset the batch was requested at
    pub position: u32,

    /// Listing stubs, in index order
    pub stubs: Vec<AdStub>,

    /// Entries dropped because they were not listings
    pub skipped: u32,
}

/// Drives one index endpoint until it returns an empty batch
pub struct CatalogPaginator<M: IndexMode> {
    mode: M,
    cursor: M::Cursor,
    base: Url,
    retry: RetryPolicy,
    index_fetches: u32,
}

impl CatalogPaginator<SearchIndex> {
    pub fn search(text: impl Into<String>, region_id: u32, base: Url, retry: RetryPolicy) -> Self {
        Self::new(
            SearchIndex {
                text: text.into(),
                region_id,
            },
            PageCursor::new(),
            base,
            retry,
        )
    }
}

impl CatalogPaginator<ShopIndex> {
    pub fn shop(seller: SellerHash, base: Url, retry: RetryPolicy) -> Self {
        Self::new(
            ShopIndex { seller },
            OffsetCursor::new(SHOP_PAGE_SIZE),
            base,
            retry,
        )
    }
}

impl<M: IndexMode> CatalogPaginator<M> {
    pub fn new(mode: M, cursor: M::Cursor, base: Url, retry: RetryPolicy) -> Self {
        Self {
            mode,
            cursor,
            base,
            retry,
            index_fetches: 0,
        }
    }

    pub fn mode(&self) -> &M {
        &self.mode
    }

    pub fn cursor(&self) -> &M::Cursor {
        &self.cursor
    }

    pub fn is_done(&self) -> bool {
        self.cursor.is_done()
    }

    /// Index requests issued so far, retries included
    pub fn index_fetches(&self) -> u32 {
        self.index_fetches
    }

    /// Fetches the batch at the cursor
    ///
    /// Returns `Ok(None)` once the endpoint has returned an empty batch; the
    /// paginator then stays finished and issues no further requests.
    /// Entries that are not listings are removed from the batch but still
    /// count towards its length, so a page of promoted entries does not end
    /// the crawl.
    pub async fn next_batch<S>(&mut self, source: &S) -> Result<Option<IndexBatch>, HarvestError>
    where
        S: PageSource + ?Sized,
    {
        if self.cursor.is_done() {
            return Ok(None);
        }

        let position = self.cursor.position();
        let url = self.mode.index_url(&self.base, &self.cursor)?;
        let raw = self.fetch_batch(source, &url).await?;

        if raw.is_empty() {
            tracing::debug!(
                "{} index exhausted at position {}",
                self.mode.name(),
                position
            );
            self.cursor.finish();
            return Ok(None);
        }

        let raw_len = raw.len();
        let stubs: Vec<AdStub> = raw.into_iter().filter(AdStub::is_item).collect();
        let skipped = (raw_len - stubs.len()) as u32;

        tracing::debug!(
            "{} index position {}: {} entries, {} skipped",
            self.mode.name(),
            position,
            raw_len,
            skipped
        );

        self.cursor.advance();

        Ok(Some(IndexBatch {
            position,
            stubs,
            skipped,
        }))
    }

    async fn fetch_batch<S>(&mut self, source: &S, url: &Url) -> Result<Vec<AdStub>, HarvestError>
    where
        S: PageSource + ?Sized,
    {
        let mut attempt = 0;

        loop {
            self.index_fetches += 1;

            let outcome = match source.fetch(url).await {
                Ok(body) => self.mode.decode_batch(&body),
                Err(e) => Err(PaginationFailure::Fetch(e)),
            };

            match outcome {
                Ok(stubs) => return Ok(stubs),
                Err(failure) if attempt < self.retry.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Index page {} failed ({}), retry {}/{}",
                        url,
                        failure,
                        attempt,
                        self.retry.retries
                    );
                    tokio::time::sleep(self.retry.backoff * attempt).await;
                }
                Err(failure) => {
                    return Err(HarvestError::Pagination {
                        url: url.to_string(),
                        source: failure,
                    })
                }
            }
        }
    }
}
