//! Storage module for persisting scraped games
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Whole-record upserts of games and their download links
//! - The durable failed set used by targeted retries
//! - Run tracking for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, Store};

use crate::state::FailureKind;
use crate::VaultError;

use std::path::Path;

/// Initializes or opens a store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file; parent directories are created
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized store
/// * `Err(VaultError)` - Failed to initialize store
pub fn open_store(path: &Path) -> Result<SqliteStore, VaultError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteStore::new(path)?)
}

/// What an upsert did to the stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The identifier was absent
    Inserted,
    /// The identifier existed with different content
    Updated,
    /// The identifier existed with identical content
    Unchanged,
}

/// A game whose latest scrape attempt failed terminally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntry {
    pub id: String,
    pub source_url: String,

    /// Listing marker at the time of the failure
    pub marker: Option<String>,

    pub reason: FailureKind,
    pub detail: String,
    pub attempt_count: u32,
    pub last_attempt_at: String,
}

/// What kind of operation a run was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Full refresh
    Refresh,
    /// Incremental refresh
    Update,
    /// Targeted retry of the failed set
    Retry,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Update => "update",
            Self::Retry => "retry",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "refresh" => Some(Self::Refresh),
            "update" => Some(Self::Update),
            "retry" => Some(Self::Retry),
            _ => None,
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// The listing crawl stopped early; the partial candidate set was processed
    Incomplete,
    Cancelled,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "incomplete" => Some(Self::Incomplete),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Outcome counts persisted with a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub new: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub not_dispatched: u64,
}

/// Represents a refresh, update or retry run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub counts: RunCounts,
}
