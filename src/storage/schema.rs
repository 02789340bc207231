//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Gamevault database.

/// SQL schema for the database
///
/// Game rows carry no scrape timestamps, so re-upserting identical content
/// leaves the table byte-for-byte the same.
pub const SCHEMA_SQL: &str = r#"
-- Track refresh, update and retry runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    new_count INTEGER NOT NULL DEFAULT 0,
    updated_count INTEGER NOT NULL DEFAULT 0,
    unchanged_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    not_dispatched_count INTEGER NOT NULL DEFAULT 0
);

-- One row per scraped game
CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    page_url TEXT NOT NULL,
    version TEXT,
    size TEXT,
    description TEXT NOT NULL DEFAULT '',
    cover_image TEXT,
    screenshots TEXT NOT NULL DEFAULT '[]',
    system_requirements TEXT NOT NULL DEFAULT '{}',
    game_info TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_games_title ON games(title);

-- Download links in page order
CREATE TABLE IF NOT EXISTS download_links (
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    host TEXT NOT NULL,
    url TEXT NOT NULL,
    PRIMARY KEY (game_id, position)
);

-- Games whose latest scrape attempt failed terminally
CREATE TABLE IF NOT EXISTS failed (
    id TEXT PRIMARY KEY,
    source_url TEXT NOT NULL,
    marker TEXT,
    reason TEXT NOT NULL,
    detail TEXT NOT NULL,
    attempt_count INTEGER NOT NULL DEFAULT 0,
    last_attempt_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failed_reason ON failed(reason);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
