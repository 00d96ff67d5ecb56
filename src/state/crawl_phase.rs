//! Crawl phase definitions for a single catalogue crawl
//!
//! Both crawl modes walk the same shape:
//! `Idle -> FetchingIndexPage -> {ItemsPresent -> ExtractingItems -> FetchingIndexPage} | {PageEmpty -> Done}`.

use crate::HarvestError;
use std::fmt;

/// Represents the current phase of one crawl call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Parameters resolved, nothing fetched yet
    Idle,

    /// An index page request is in flight
    FetchingIndexPage,

    /// The last index page returned a non-empty batch
    ItemsPresent,

    /// Detail pages of the current batch are being fetched and extracted
    ExtractingItems,

    /// The last index page returned an empty batch
    PageEmpty,

    /// Terminal: the catalogue is complete
    Done,
}

impl CrawlPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::FetchingIndexPage)
                | (Self::FetchingIndexPage, Self::ItemsPresent)
                | (Self::FetchingIndexPage, Self::PageEmpty)
                | (Self::ItemsPresent, Self::ExtractingItems)
                | (Self::ExtractingItems, Self::FetchingIndexPage)
                | (Self::PageEmpty, Self::Done)
        )
    }

    /// Moves to `next`, rejecting transitions outside the crawl shape
    pub fn transition(self, next: CrawlPhase) -> Result<CrawlPhase, HarvestError> {
        if self.can_transition_to(next) {
            tracing::trace!("Crawl phase {} -> {}", self, next);
            Ok(next)
        } else {
            Err(HarvestError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingIndexPage => "fetching_index_page",
            Self::ItemsPresent => "items_present",
            Self::ExtractingItems => "extracting_items",
            Self::PageEmpty => "page_empty",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
