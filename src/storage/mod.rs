//! Storage module for harvest inputs and results
//!
//! This module handles all database operations for batch harvesting:
//! - SQLite database initialization and schema management
//! - Search phrases, their excluded words and cities
//! - Competitor listings kept by each run
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::catalogue::AdRecord;
use crate::HarvestError;

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A phrase to search for, bound to one of our own items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPhrase {
    pub id: i64,
    pub item_id: i64,
    pub phrase: String,
}

/// A region to search in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct City {
    pub id: i64,
    pub name: String,
}

/// A kept listing, tagged with what it was found for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompetitorListing {
    pub run_id: i64,
    pub search_phrase_id: i64,
    pub item_id: i64,
    pub city_id: i64,
    pub title: String,
    pub url: String,
    pub price: u64,
    pub seller_name: String,
}

impl CompetitorListing {
    pub fn new(run_id: i64, phrase: &SearchPhrase, city: &City, record: &AdRecord) -> Self {
        Self {
            run_id,
            search_phrase_id: phrase.id,
            item_id: phrase.item_id,
            city_id: city.id,
            title: record.title.clone(),
            url: record.url.clone(),
            price: record.price,
            seller_name: record.seller_name.clone(),
        }
    }
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
