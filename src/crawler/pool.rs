//! Bounded worker pool shared by refreshes and retries
//!
//! Workers only fetch and parse. Every outcome comes back to the task that
//! owns the pool, which is the single writer to the store. A worker that
//! panics still leaves its item in the failed set. A cancelled run stops
//! dispatching, lets in-flight items finish as `cancelled`, and counts what
//! was never dispatched.

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::RecordParser;
use crate::model::{Candidate, GameRecord};
use crate::output::RunSummary;
use crate::state::FailureKind;
use crate::storage::{FailedEntry, StorageError, Store};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One game page to scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: String,
    pub source_url: String,

    /// Listing marker stamped onto the record so the next diff compares like
    /// with like
    pub marker: Option<String>,
}

impl From<&Candidate> for WorkItem {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.clone(),
            source_url: candidate.source_url.clone(),
            marker: candidate.marker.clone(),
        }
    }
}

impl From<FailedEntry> for WorkItem {
    fn from(entry: FailedEntry) -> Self {
        Self {
            id: entry.id,
            source_url: entry.source_url,
            marker: entry.marker,
        }
    }
}

/// Result of driving one item through fetch and parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Scraped(GameRecord),
    Failed { kind: FailureKind, detail: String },
}

/// Fetch-then-parse pipeline for a single item
pub struct PageScraper {
    fetcher: Arc<dyn PageFetcher>,
    parser: Arc<dyn RecordParser>,
}

impl PageScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>, parser: Arc<dyn RecordParser>) -> Self {
        Self { fetcher, parser }
    }

    /// Fetches and parses one item; never touches the store
    pub async fn scrape(&self, item: &WorkItem) -> ItemOutcome {
        let html = match self.fetcher.fetch(&item.source_url).await {
            Ok(html) => html,
            Err(e) => {
                return ItemOutcome::Failed {
                    kind: e.failure_kind(),
                    detail: e.to_string(),
                }
            }
        };

        match self.parser.parse(&item.source_url, &html) {
            Ok(mut record) => {
                // The failed set is keyed by the work item id
                record.id = item.id.clone();
                if item.marker.is_some() {
                    record.version = item.marker.clone();
                }
                ItemOutcome::Scraped(record)
            }
            Err(e) => ItemOutcome::Failed {
                kind: FailureKind::ParseError,
                detail: e.to_string(),
            },
        }
    }
}

/// Writes one outcome to the store and counts it
fn apply_outcome(
    store: &dyn Store,
    item: &WorkItem,
    outcome: ItemOutcome,
    summary: &mut RunSummary,
) -> Result<(), StorageError> {
    match outcome {
        ItemOutcome::Scraped(record) => {
            let result = store.commit_success(&record)?;
            debug!(id = %item.id, ?result, "Committed");
            summary.record_success(result);
        }
        ItemOutcome::Failed { kind, detail } => {
            warn!(id = %item.id, reason = %kind, %detail, "Scrape failed");
            store.mark_failed(
                &item.id,
                &item.source_url,
                item.marker.as_deref(),
                kind,
                &detail,
            )?;
            summary.record_failure(&item.id);
        }
    }
    Ok(())
}

/// Drives `items` through `scraper` with at most `workers` in flight
///
/// # Arguments
///
/// * `items` - Work in dispatch order
/// * `workers` - Maximum concurrent scrapes (at least 1)
/// * `scraper` - The per-item pipeline
/// * `store` - Receives every outcome from this task only
/// * `cancel` - Stops dispatch and interrupts in-flight items
///
/// # Returns
///
/// * `Ok(RunSummary)` - Every dispatched item reached a terminal state
/// * `Err(StorageError)` - A store write failed; outstanding work is aborted
pub async fn run_pool(
    items: Vec<WorkItem>,
    workers: usize,
    scraper: Arc<PageScraper>,
    store: &dyn Store,
    cancel: &CancellationToken,
) -> Result<RunSummary, StorageError> {
    let workers = workers.max(1);
    let total = items.len();
    // A fatal store error cancels this run without cancelling the caller
    let run_cancel = cancel.child_token();

    let mut queue = items.into_iter();
    let mut in_flight = JoinSet::new();
    // Items by task id, so a panicked task's item can still be recorded
    let mut dispatched: HashMap<task::Id, WorkItem> = HashMap::new();
    let mut summary = RunSummary::default();

    info!(items = total, workers, "Dispatching work");

    loop {
        // Top up in-flight tasks
        while in_flight.len() < workers && !run_cancel.is_cancelled() {
            let Some(item) = queue.next() else {
                break;
            };

            let scraper = Arc::clone(&scraper);
            let token = run_cancel.clone();
            let work = item.clone();
            let handle = in_flight.spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => ItemOutcome::Failed {
                        kind: FailureKind::Cancelled,
                        detail: "run cancelled before the item finished".to_string(),
                    },
                    outcome = scraper.scrape(&work) => outcome,
                }
            });
            dispatched.insert(handle.id(), item);
        }

        // Reap one completed task
        let Some(joined) = in_flight.join_next_with_id().await else {
            break;
        };

        let (task_id, outcome) = match joined {
            Ok((task_id, outcome)) => (task_id, outcome),
            Err(e) => {
                error!(error = %e, "Worker task did not complete");
                let detail = if e.is_panic() {
                    "worker panicked while scraping".to_string()
                } else {
                    format!("worker task failed: {}", e)
                };
                (
                    e.id(),
                    ItemOutcome::Failed {
                        kind: FailureKind::WorkerPanic,
                        detail,
                    },
                )
            }
        };

        let Some(item) = dispatched.remove(&task_id) else {
            error!(?task_id, "Completed task has no dispatched item");
            summary.failed += 1;
            continue;
        };

        if let Err(e) = apply_outcome(store, &item, outcome, &mut summary) {
            error!(id = %item.id, error = %e, "Store write failed, aborting run");
            run_cancel.cancel();
            in_flight.abort_all();
            return Err(e);
        }
    }

    summary.not_dispatched = queue.count() as u64;
    summary.cancelled = cancel.is_cancelled();

    info!(
        new = summary.new,
        updated = summary.updated,
        unchanged = summary.unchanged,
        failed = summary.failed,
        not_dispatched = summary.not_dispatched,
        "Work finished"
    );

    Ok(summary)
}
