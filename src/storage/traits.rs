//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::model::GameRecord;
use crate::state::FailureKind;
use crate::storage::{FailedEntry, RunCounts, RunKind, RunRecord, RunStatus, UpsertOutcome};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Any of these aborts a running refresh or retry; per-item scrape failures
/// are data, not storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store lock poisoned by a panicked writer")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Every method takes `&self` so one store can be shared as `Arc<dyn Store>`
/// between the scheduler, the retry coordinator and the CLI. Each mutating
/// method is atomic: after a crash the store holds either the state before or
/// the state after the call.
pub trait Store: Send + Sync {
    // ===== Game Records =====

    /// Writes or replaces a record as a whole unit
    ///
    /// Returns whether the identifier was new, changed, or already held
    /// identical content.
    fn upsert(&self, record: &GameRecord) -> StorageResult<UpsertOutcome>;

    /// Gets a record by identifier
    fn get(&self, id: &str) -> StorageResult<Option<GameRecord>>;

    /// Lists every record ordered by identifier
    fn list_all(&self) -> StorageResult<Vec<GameRecord>>;

    /// Gets the stored update marker for every identifier
    ///
    /// Cheaper than [`Store::list_all`] when only membership and markers matter.
    fn stored_markers(&self) -> StorageResult<BTreeMap<String, Option<String>>>;

    /// Case-insensitive substring search over titles, ordered by identifier
    fn search(&self, query: &str) -> StorageResult<Vec<GameRecord>>;

    /// Records with an empty title or no download links
    fn find_incomplete(&self) -> StorageResult<Vec<GameRecord>>;

    // ===== Failed Set =====

    /// Records a terminal failure for an identifier
    ///
    /// An existing entry keeps its identity: the attempt count is incremented
    /// and reason, detail, source URL, marker and timestamp are refreshed.
    /// `marker` is the listing marker the item was dispatched with, restored
    /// when the entry is retried.
    fn mark_failed(
        &self,
        id: &str,
        source_url: &str,
        marker: Option<&str>,
        reason: FailureKind,
        detail: &str,
    ) -> StorageResult<()>;

    /// Removes an identifier from the failed set
    fn clear_failed(&self, id: &str) -> StorageResult<()>;

    /// Lists the failed set ordered by identifier
    fn list_failed(&self) -> StorageResult<Vec<FailedEntry>>;

    /// Writes a record and clears its failed entry in one transaction
    fn commit_success(&self, record: &GameRecord) -> StorageResult<UpsertOutcome>;

    /// Deletes all records, links and failures in one transaction
    ///
    /// Run history is kept.
    fn delete_all(&self) -> StorageResult<()>;

    // ===== Run Bookkeeping =====

    /// Creates a run in the `running` state and returns its ID
    fn create_run(&self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    /// Stamps a run with its final status and counts
    fn finish_run(&self, run_id: i64, status: RunStatus, counts: &RunCounts)
        -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Most recent runs, newest first
    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;

    // ===== Statistics =====

    /// Total number of stored records
    fn count_records(&self) -> StorageResult<u64>;

    /// Total number of stored download links
    fn count_download_links(&self) -> StorageResult<u64>;

    /// Failed entries grouped by reason
    fn count_failed_by_reason(&self) -> StorageResult<BTreeMap<FailureKind, u64>>;
}
