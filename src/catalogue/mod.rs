//! Catalogue crawling
//!
//! A crawl walks a listing index page by page, fetches the detail page of
//! every listing on it, extracts a record and runs it through a filter
//! pipeline. Index failures abort the crawl; detail failures only degrade
//! the affected record.

pub mod extractor;
pub mod filter;
pub mod model;
pub mod orchestrator;
pub mod paginator;

pub use extractor::{ConditionMarkers, Extraction, ExtractionError, PageExtractor};
pub use filter::{DropReason, FilterPipeline, Predicate, Verdict};
pub use model::{
    AdRecord, AdStub, Catalogue, CrawlStats, FilterCriteria, SearchQuery, ShopQuery, StubKind,
    CONDITION_NEW,
};
pub use orchestrator::{CrawlOrchestrator, CrawlSettings};
pub use paginator::{
    CatalogPaginator, Cursor, IndexBatch, IndexMode, OffsetCursor, PageCursor, PaginationFailure,
    RetryPolicy, SearchIndex, ShopIndex, SHOP_PAGE_SIZE,
};
