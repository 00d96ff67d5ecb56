//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{City, CompetitorListing, RunRecord, RunStatus, SearchPhrase};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and applies the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?).unwrap_or(RunStatus::Failed),
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Harvest Inputs =====

    fn insert_or_get_search_phrase(&mut self, item_id: i64, phrase: &str) -> StorageResult<i64> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Err(StorageError::InvalidValue("empty search phrase".to_string()));
        }

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM search_phrases WHERE item_id = ?1 AND phrase = ?2",
                params![item_id, phrase],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO search_phrases (item_id, phrase) VALUES (?1, ?2)",
            params![item_id, phrase],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn add_excluded_word(&mut self, search_phrase_id: i64, word: &str) -> StorageResult<()> {
        let word = word.trim();
        if word.is_empty() {
            return Err(StorageError::InvalidValue("empty excluded word".to_string()));
        }

        let known: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM search_phrases WHERE id = ?1",
                params![search_phrase_id],
                |row| row.get(0),
            )
            .optional()?;

        if known.is_none() {
            return Err(StorageError::SearchPhraseNotFound(search_phrase_id));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO excluded_words (search_phrase_id, word) VALUES (?1, ?2)",
            params![search_phrase_id, word],
        )?;
        Ok(())
    }

    fn insert_or_get_city(&mut self, name: &str) -> StorageResult<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidValue("empty city name".to_string()));
        }

        self.conn.execute(
            "INSERT OR IGNORE INTO cities (name) VALUES (?1)",
            params![name],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM cities WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_search_phrases(&self) -> StorageResult<Vec<SearchPhrase>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, item_id, phrase FROM search_phrases ORDER BY id")?;

        let phrases = stmt
            .query_map([], |row| {
                Ok(SearchPhrase {
                    id: row.get(0)?,
                    item_id: row.get(1)?,
                    phrase: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(phrases)
    }

    fn get_excluded_words(&self, search_phrase_id: i64) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT word FROM excluded_words WHERE search_phrase_id = ?1 ORDER BY id",
        )?;

        let words = stmt
            .query_map(params![search_phrase_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    fn get_cities(&self) -> StorageResult<Vec<City>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM cities ORDER BY id")?;

        let cities = stmt
            .query_map([], |row| {
                Ok(City {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(cities)
    }

    // ===== Harvest Output =====

    fn insert_listings(&mut self, listings: &[CompetitorListing]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO competitor_listings
                 (run_id, search_phrase_id, item_id, city_id, title, url, price, seller_name, collected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;

            for listing in listings {
                let price = i64::try_from(listing.price).map_err(|_| {
                    StorageError::InvalidValue(format!("price out of range: {}", listing.price))
                })?;

                stmt.execute(params![
                    listing.run_id,
                    listing.search_phrase_id,
                    listing.item_id,
                    listing.city_id,
                    listing.title,
                    listing.url,
                    price,
                    listing.seller_name,
                    now
                ])?;
            }
        }

        tx.commit()?;
        Ok(listings.len())
    }

    // ===== Statistics =====

    fn count_listings(&self) -> StorageResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM competitor_listings", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_listings_for_run(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM competitor_listings WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_listings_by_city(&self) -> StorageResult<Vec<(String, u64)>> {
        let query = "
            SELECT c.name, COUNT(l.id)
            FROM cities c
            LEFT JOIN competitor_listings l ON l.city_id = c.id
            GROUP BY c.id
            ORDER BY c.id
        ";

        let mut stmt = self.conn.prepare(query)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(run_id: i64, phrase: &SearchPhrase, city: &City, url: &str) -> CompetitorListing {
        CompetitorListing {
            run_id,
            search_phrase_id: phrase.id,
            item_id: phrase.item_id,
            city_id: city.id,
            title: "Фара".to_string(),
            url: url.to_string(),
            price: 1500,
            seller_name: "AutoParts".to_string(),
        }
    }

    fn seeded() -> (SqliteStorage, SearchPhrase, City) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let phrase_id = storage.insert_or_get_search_phrase(42, "фара").unwrap();
        let city_id = storage.insert_or_get_city("Москва").unwrap();
        let phrase = SearchPhrase {
            id: phrase_id,
            item_id: 42,
            phrase: "фара".to_string(),
        };
        let city = City {
            id: city_id,
            name: "Москва".to_string(),
        };
        (storage, phrase, city)
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash").unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        storage.finish_run(run_id, RunStatus::Completed).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(99),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(matches!(
            storage.finish_run(99, RunStatus::Failed),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_duplicate_inputs_return_existing_ids() {
        let (mut storage, phrase, city) = seeded();

        assert_eq!(
            storage.insert_or_get_search_phrase(42, " фара ").unwrap(),
            phrase.id
        );
        assert_eq!(storage.insert_or_get_city("Москва").unwrap(), city.id);
        assert_eq!(storage.get_search_phrases().unwrap(), vec![phrase]);
        assert_eq!(storage.get_cities().unwrap(), vec![city]);
    }

    #[test]
    fn test_blank_inputs_are_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.insert_or_get_search_phrase(1, "  "),
            Err(StorageError::InvalidValue(_))
        ));
        assert!(matches!(
            storage.insert_or_get_city(""),
            Err(StorageError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_excluded_words_per_phrase() {
        let (mut storage, phrase, _) = seeded();
        let other = storage.insert_or_get_search_phrase(43, "фонарь").unwrap();

        storage.add_excluded_word(phrase.id, "корпус").unwrap();
        storage.add_excluded_word(phrase.id, "стекло").unwrap();
        storage.add_excluded_word(phrase.id, "корпус").unwrap();
        storage.add_excluded_word(other, "плата").unwrap();

        assert_eq!(
            storage.get_excluded_words(phrase.id).unwrap(),
            vec!["корпус".to_string(), "стекло".to_string()]
        );
        assert_eq!(storage.get_excluded_words(other).unwrap(), vec!["плата"]);

        assert!(matches!(
            storage.add_excluded_word(999, "x"),
            Err(StorageError::SearchPhraseNotFound(999))
        ));
    }

    #[test]
    fn test_insert_listings_and_counts() {
        let (mut storage, phrase, city) = seeded();
        let spb = City {
            id: storage.insert_or_get_city("Санкт-Петербург").unwrap(),
            name: "Санкт-Петербург".to_string(),
        };
        let run_id = storage.create_run("hash").unwrap();

        let inserted = storage
            .insert_listings(&[
                listing(run_id, &phrase, &city, "https://www.avito.ru/a"),
                listing(run_id, &phrase, &city, "https://www.avito.ru/a"),
            ])
            .unwrap();
        assert_eq!(inserted, 2);

        assert_eq!(storage.count_listings().unwrap(), 2);
        assert_eq!(storage.count_listings_for_run(run_id).unwrap(), 2);
        assert_eq!(
            storage.count_listings_by_city().unwrap(),
            vec![("Москва".to_string(), 2), (spb.name.clone(), 0)]
        );
    }

    #[test]
    fn test_insert_listings_is_atomic() {
        let (mut storage, phrase, city) = seeded();
        let run_id = storage.create_run("hash").unwrap();

        let mut bad = listing(run_id, &phrase, &city, "https://www.avito.ru/b");
        bad.price = u64::MAX;

        let result = storage.insert_listings(&[
            listing(run_id, &phrase, &city, "https://www.avito.ru/a"),
            bad,
        ]);

        assert!(matches!(result, Err(StorageError::InvalidValue(_))));
        assert_eq!(storage.count_listings().unwrap(), 0);
    }
}
