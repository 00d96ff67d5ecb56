//! Database schema definitions
//!
//! Search phrases, their excluded words and the cities to search in are
//! inputs of a batch harvest; competitor listings are its output.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Phrases to search for, each bound to one of our own items
CREATE TABLE IF NOT EXISTS search_phrases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL,
    phrase TEXT NOT NULL,
    UNIQUE(item_id, phrase)
);

-- Title words that disqualify a listing for one phrase
CREATE TABLE IF NOT EXISTS excluded_words (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_phrase_id INTEGER NOT NULL REFERENCES search_phrases(id) ON DELETE CASCADE,
    word TEXT NOT NULL,
    UNIQUE(search_phrase_id, word)
);

CREATE INDEX IF NOT EXISTS idx_excluded_words_phrase ON excluded_words(search_phrase_id);

-- Regions to search in, by human-readable name
CREATE TABLE IF NOT EXISTS cities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

-- Listings kept by a harvest run
CREATE TABLE IF NOT EXISTS competitor_listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    search_phrase_id INTEGER NOT NULL REFERENCES search_phrases(id),
    item_id INTEGER NOT NULL,
    city_id INTEGER NOT NULL REFERENCES cities(id),
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    price INTEGER NOT NULL,
    seller_name TEXT NOT NULL,
    collected_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listings_run ON competitor_listings(run_id);
CREATE INDEX IF NOT EXISTS idx_listings_city ON competitor_listings(city_id);
CREATE INDEX IF NOT EXISTS idx_listings_item ON competitor_listings(item_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
