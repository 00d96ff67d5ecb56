//! Catalogue data model
//!
//! Stubs come from listing-index pages, records from detail pages. A record
//! is always fully populated: every field carries either the extracted value
//! or its default.

use crate::catalogue::filter::DropReason;
use crate::config::FiltersConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical condition value for listings marked as new
pub const CONDITION_NEW: &str = "New";

/// Kind of an entry on a listing-index page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubKind {
    /// A regular listing
    Item,
    /// Promoted slots, banners and anything else that is not a listing
    Other,
}

impl StubKind {
    /// Maps the index `type` field onto a stub kind
    pub fn from_index_type(kind: &str) -> Self {
        if kind == "item" {
            Self::Item
        } else {
            Self::Other
        }
    }
}

/// Minimal listing reference taken from an index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdStub {
    /// Path relative to the marketplace origin
    pub url_path: String,
    pub kind: StubKind,
}

impl AdStub {
    pub fn item(url_path: impl Into<String>) -> Self {
        Self {
            url_path: url_path.into(),
            kind: StubKind::Item,
        }
    }

    pub fn is_item(&self) -> bool {
        self.kind == StubKind::Item
    }
}

/// Fully extracted listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdRecord {
    pub title: String,
    pub description: String,
    pub price: u64,
    pub seller_name: String,
    pub condition: String,
    pub views: String,
    pub url: String,
}

impl AdRecord {
    /// A record with every extracted field at its default
    pub fn blank(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Returns true if no field beyond the URL carries a value
    pub fn is_blank(&self) -> bool {
        *self == Self::blank(self.url.clone())
    }

    pub fn is_new(&self) -> bool {
        self.condition == CONDITION_NEW
    }
}

/// Search-mode crawl parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub region_name: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, region_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            region_name: region_name.into(),
        }
    }
}

/// Shop-mode crawl parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopQuery {
    pub shop_url: String,
}

impl ShopQuery {
    pub fn new(shop_url: impl Into<String>) -> Self {
        Self {
            shop_url: shop_url.into(),
        }
    }
}

/// Inclusion criteria for search crawls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub require_new_condition: bool,
    pub excluded_words: HashSet<String>,
    pub excluded_sellers: HashSet<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            require_new_condition: true,
            excluded_words: HashSet::new(),
            excluded_sellers: HashSet::new(),
        }
    }
}

impl FilterCriteria {
    pub fn with_excluded_words<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.excluded_words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn with_excluded_sellers<I, W>(mut self, sellers: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.excluded_sellers
            .extend(sellers.into_iter().map(Into::into));
        self
    }

    pub fn require_new_condition(mut self, required: bool) -> Self {
        self.require_new_condition = required;
        self
    }
}

impl From<&FiltersConfig> for FilterCriteria {
    fn from(config: &FiltersConfig) -> Self {
        Self::default()
            .require_new_condition(config.require_new_condition)
            .with_excluded_words(config.excluded_words.iter().cloned())
            .with_excluded_sellers(config.excluded_sellers.iter().cloned())
    }
}

/// Counters describing one crawl call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Index page requests, retries included
    pub index_fetches: u32,

    /// Detail page requests
    pub detail_fetches: u32,

    /// Index entries that were not listings
    pub skipped_stubs: u32,

    /// Records that fell back to defaults
    pub degraded: u32,

    pub kept: u32,
    pub dropped_condition: u32,
    pub dropped_words: u32,
    pub dropped_sellers: u32,
}

impl CrawlStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Condition => self.dropped_condition += 1,
            DropReason::ExcludedWord => self.dropped_words += 1,
            DropReason::ExcludedSeller => self.dropped_sellers += 1,
        }
    }

    pub fn dropped(&self) -> u32 {
        self.dropped_condition + self.dropped_words + self.dropped_sellers
    }

    /// Records that went through the filter pipeline
    pub fn processed(&self) -> u32 {
        self.kept + self.dropped()
    }
}

/// Ordered result of one crawl call
///
/// Order is index page order, then order within the page. Duplicates
/// returned by the index are kept.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    records: Vec<AdRecord>,
    pub stats: CrawlStats,
}

impl Catalogue {
    pub fn push(&mut self, record: AdRecord) {
        self.records.push(record);
        self.stats.kept += 1;
    }

    pub fn records(&self) -> &[AdRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<AdRecord> {
        self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AdRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a AdRecord;
    type IntoIter = std::slice::Iter<'a, AdRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
