//! Storage traits and error types

use crate::storage::{City, CompetitorListing, RunRecord, RunStatus, SearchPhrase};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Search phrase not found: {0}")]
    SearchPhraseNotFound(i64),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes take `&mut self`; a backend is owned by one harvest at a time.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run in the `running` state and returns its id
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Harvest Inputs =====

    /// Inserts a search phrase or returns the id of the existing one
    fn insert_or_get_search_phrase(&mut self, item_id: i64, phrase: &str) -> StorageResult<i64>;

    /// Adds an excluded word to a phrase; duplicates are ignored
    fn add_excluded_word(&mut self, search_phrase_id: i64, word: &str) -> StorageResult<()>;

    /// Inserts a city or returns the id of the existing one
    fn insert_or_get_city(&mut self, name: &str) -> StorageResult<i64>;

    /// All search phrases in insertion order
    fn get_search_phrases(&self) -> StorageResult<Vec<SearchPhrase>>;

    fn get_excluded_words(&self, search_phrase_id: i64) -> StorageResult<Vec<String>>;

    /// All cities in insertion order
    fn get_cities(&self) -> StorageResult<Vec<City>>;

    // ===== Harvest Output =====

    /// Inserts listings atomically: either all rows are written or none
    fn insert_listings(&mut self, listings: &[CompetitorListing]) -> StorageResult<usize>;

    // ===== Statistics =====

    fn count_listings(&self) -> StorageResult<u64>;

    fn count_listings_for_run(&self, run_id: i64) -> StorageResult<u64>;

    /// Listing count per city name, cities without listings included
    fn count_listings_by_city(&self) -> StorageResult<Vec<(String, u64)>>;
}
