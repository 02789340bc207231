//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.
//! The connection sits behind a mutex, so every call is serialized and each
//! mutating call runs in its own transaction.

use crate::model::{DownloadLink, GameRecord};
use crate::state::FailureKind;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, Store};
use crate::storage::{FailedEntry, RunCounts, RunKind, RunRecord, RunStatus, UpsertOutcome};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const GAME_COLUMNS: &str = "id, title, page_url, version, size, description, cover_image, \
                            screenshots, system_requirements, game_info";

const RUN_COLUMNS: &str = "id, kind, started_at, finished_at, config_hash, status, new_count, \
                           updated_count, unchanged_count, failed_count, not_dispatched_count";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // WAL keeps readers off the writer's back and survives crashes mid-write
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

// ===== Row Mapping =====

/// Raw `games` row before the JSON columns are decoded
struct GameRow {
    id: String,
    title: String,
    page_url: String,
    version: Option<String>,
    size: Option<String>,
    description: String,
    cover_image: Option<String>,
    screenshots: String,
    system_requirements: String,
    game_info: String,
}

impl GameRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            page_url: row.get(2)?,
            version: row.get(3)?,
            size: row.get(4)?,
            description: row.get(5)?,
            cover_image: row.get(6)?,
            screenshots: row.get(7)?,
            system_requirements: row.get(8)?,
            game_info: row.get(9)?,
        })
    }

    fn into_record(self, download_links: Vec<DownloadLink>) -> StorageResult<GameRecord> {
        Ok(GameRecord {
            screenshots: decode_json(&self.screenshots)?,
            system_requirements: decode_json(&self.system_requirements)?,
            game_info: decode_json(&self.game_info)?,
            id: self.id,
            title: self.title,
            page_url: self.page_url,
            version: self.version,
            size: self.size,
            description: self.description,
            cover_image: self.cover_image,
            download_links,
        })
    }
}

fn run_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: RunKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunKind::Refresh),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
        counts: RunCounts {
            new: row.get::<_, i64>(6)? as u64,
            updated: row.get::<_, i64>(7)? as u64,
            unchanged: row.get::<_, i64>(8)? as u64,
            failed: row.get::<_, i64>(9)? as u64,
            not_dispatched: row.get::<_, i64>(10)? as u64,
        },
    })
}

fn encode_json<T: Serialize>(value: &T) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_json<T: DeserializeOwned>(text: &str) -> StorageResult<T> {
    serde_json::from_str(text).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Escapes LIKE wildcards so user input matches literally
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ===== Record Helpers =====

fn load_links(conn: &Connection, game_id: &str) -> StorageResult<Vec<DownloadLink>> {
    let mut stmt = conn.prepare(
        "SELECT host, url FROM download_links WHERE game_id = ?1 ORDER BY position",
    )?;

    let links = stmt
        .query_map(params![game_id], |row| {
            Ok(DownloadLink {
                host: row.get(0)?,
                url: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(links)
}

/// Loads full records matching a `WHERE` clause, ordered by identifier
fn query_records(
    conn: &Connection,
    filter: &str,
    args: &[&dyn ToSql],
) -> StorageResult<Vec<GameRecord>> {
    let sql = format!("SELECT {} FROM games {} ORDER BY id", GAME_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;

    let rows = stmt
        .query_map(args, GameRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| {
            let links = load_links(conn, &row.id)?;
            row.into_record(links)
        })
        .collect()
}

fn read_record(conn: &Connection, id: &str) -> StorageResult<Option<GameRecord>> {
    Ok(query_records(conn, "WHERE id = ?1", &[&id])?.pop())
}

/// Replaces a record and its links; must run inside a transaction
fn write_record(conn: &Connection, record: &GameRecord) -> StorageResult<UpsertOutcome> {
    let outcome = match read_record(conn, &record.id)? {
        None => UpsertOutcome::Inserted,
        Some(existing) if existing == *record => return Ok(UpsertOutcome::Unchanged),
        Some(_) => UpsertOutcome::Updated,
    };

    conn.execute(
        "INSERT INTO games (id, title, page_url, version, size, description, cover_image,
                            screenshots, system_requirements, game_info)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            page_url = excluded.page_url,
            version = excluded.version,
            size = excluded.size,
            description = excluded.description,
            cover_image = excluded.cover_image,
            screenshots = excluded.screenshots,
            system_requirements = excluded.system_requirements,
            game_info = excluded.game_info",
        params![
            record.id,
            record.title,
            record.page_url,
            record.version,
            record.size,
            record.description,
            record.cover_image,
            encode_json(&record.screenshots)?,
            encode_json(&record.system_requirements)?,
            encode_json(&record.game_info)?,
        ],
    )?;

    conn.execute(
        "DELETE FROM download_links WHERE game_id = ?1",
        params![record.id],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO download_links (game_id, position, host, url) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, link) in record.download_links.iter().enumerate() {
        stmt.execute(params![record.id, position as i64, link.host, link.url])?;
    }

    Ok(outcome)
}

impl Store for SqliteStore {
    // ===== Game Records =====

    fn upsert(&self, record: &GameRecord) -> StorageResult<UpsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let outcome = write_record(&tx, record)?;
        tx.commit()?;
        Ok(outcome)
    }

    fn get(&self, id: &str) -> StorageResult<Option<GameRecord>> {
        let conn = self.lock()?;
        read_record(&conn, id)
    }

    fn list_all(&self) -> StorageResult<Vec<GameRecord>> {
        let conn = self.lock()?;
        query_records(&conn, "", &[])
    }

    fn stored_markers(&self) -> StorageResult<BTreeMap<String, Option<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, version FROM games ORDER BY id")?;

        let markers = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<String, Option<String>>, _>>()?;

        Ok(markers)
    }

    fn search(&self, query: &str) -> StorageResult<Vec<GameRecord>> {
        let conn = self.lock()?;
        let pattern = format!("%{}%", escape_like(query.trim()));
        // LIKE is case-insensitive for ASCII
        query_records(&conn, "WHERE title LIKE ?1 ESCAPE '\\'", &[&pattern])
    }

    fn find_incomplete(&self) -> StorageResult<Vec<GameRecord>> {
        let conn = self.lock()?;
        query_records(
            &conn,
            "WHERE trim(title) = ''
                OR NOT EXISTS (SELECT 1 FROM download_links l WHERE l.game_id = games.id)",
            &[],
        )
    }

    // ===== Failed Set =====

    fn mark_failed(
        &self,
        id: &str,
        source_url: &str,
        marker: Option<&str>,
        reason: FailureKind,
        detail: &str,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO failed (id, source_url, marker, reason, detail, attempt_count, last_attempt_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
             ON CONFLICT(id) DO UPDATE SET
                source_url = excluded.source_url,
                marker = excluded.marker,
                reason = excluded.reason,
                detail = excluded.detail,
                attempt_count = failed.attempt_count + 1,
                last_attempt_at = excluded.last_attempt_at",
            params![id, source_url, marker, reason.to_db_string(), detail, now],
        )?;
        Ok(())
    }

    fn clear_failed(&self, id: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM failed WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn list_failed(&self) -> StorageResult<Vec<FailedEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, source_url, marker, reason, detail, attempt_count, last_attempt_at
             FROM failed ORDER BY id",
        )?;

        let entries = stmt
            .query_map([], |row| {
                Ok(FailedEntry {
                    id: row.get(0)?,
                    source_url: row.get(1)?,
                    marker: row.get(2)?,
                    reason: FailureKind::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(FailureKind::ParseError),
                    detail: row.get(4)?,
                    attempt_count: row.get(5)?,
                    last_attempt_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn commit_success(&self, record: &GameRecord) -> StorageResult<UpsertOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let outcome = write_record(&tx, record)?;
        tx.execute("DELETE FROM failed WHERE id = ?1", params![record.id])?;
        tx.commit()?;
        Ok(outcome)
    }

    fn delete_all(&self) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM download_links", [])?;
        tx.execute("DELETE FROM games", [])?;
        tx.execute("DELETE FROM failed", [])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Run Bookkeeping =====

    fn create_run(&self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn finish_run(
        &self,
        run_id: i64,
        status: RunStatus,
        counts: &RunCounts,
    ) -> StorageResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, new_count = ?3, updated_count = ?4,
                unchanged_count = ?5, failed_count = ?6, not_dispatched_count = ?7
             WHERE id = ?8",
            params![
                status.to_db_string(),
                now,
                counts.new as i64,
                counts.updated as i64,
                counts.unchanged as i64,
                counts.failed as i64,
                counts.not_dispatched as i64,
                run_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        conn.query_row(&sql, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT ?1", RUN_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    // ===== Statistics =====

    fn count_records(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_download_links(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM download_links", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_failed_by_reason(&self) -> StorageResult<BTreeMap<FailureKind, u64>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT reason, COUNT(*) FROM failed GROUP BY reason")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = BTreeMap::new();
        for (reason, count) in rows {
            if let Some(kind) = FailureKind::from_db_string(&reason) {
                *summary.entry(kind).or_insert(0) += count as u64;
            }
        }

        Ok(summary)
    }
}
