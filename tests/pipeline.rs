//! Integration tests for the scrape pipeline
//!
//! These tests drive refreshes, retries and update checks against in-process
//! fake listings and fetchers, persisting into a real SQLite file.

use async_trait::async_trait;
use gamevault::config::{Config, FetchConfig, ScraperConfig, SourceConfig, StoreConfig};
use gamevault::crawler::{
    Coordinator, FetchError, ListingPage, ListingSource, PageFetcher, PageScraper, ParseError,
    RecordParser, RefreshMode, RetryCoordinator, ScrapeScheduler,
};
use gamevault::storage::{
    FailedEntry, RunCounts, RunKind, RunRecord, RunStatus, SqliteStore, StorageError,
    StorageResult, Store, UpsertOutcome,
};
use gamevault::{Candidate, ChangeKind, DownloadLink, FailureKind, GameRecord, VaultError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ===== Fakes =====

fn page_url(id: &str) -> String {
    format!("https://games.test/{}/", id)
}

fn candidate(id: &str, marker: Option<&str>) -> Candidate {
    Candidate {
        id: id.to_string(),
        source_url: page_url(id),
        title: id.to_uppercase(),
        marker: marker.map(String::from),
    }
}

/// Listing served from memory; each page announces a successor until the last
struct FakeListing {
    pages: Vec<Result<Vec<Candidate>, FetchError>>,
}

impl FakeListing {
    fn new(pages: Vec<Result<Vec<Candidate>, FetchError>>) -> Self {
        Self { pages }
    }

    fn of_ids(pages: &[&[&str]]) -> Self {
        Self::new(
            pages
                .iter()
                .map(|ids| Ok(ids.iter().map(|id| candidate(id, None)).collect()))
                .collect(),
        )
    }
}

#[async_trait]
impl ListingSource for FakeListing {
    async fn fetch_page(&self, page: u32) -> Result<ListingPage, FetchError> {
        let index = page as usize - 1;
        match self.pages.get(index) {
            Some(Ok(entries)) => Ok(ListingPage {
                entries: entries.clone(),
                has_more: index + 1 < self.pages.len(),
            }),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(ListingPage::default()),
        }
    }
}

/// Serves `<title>|<id>` bodies, with scripted failures and stalls
#[derive(Default)]
struct FakeFetcher {
    /// Remaining failures per URL; `u32::MAX` fails forever
    failures: Mutex<HashMap<String, u32>>,
    stalled: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn failing(ids: &[&str]) -> Self {
        Self::failing_times(ids, u32::MAX)
    }

    fn failing_times(ids: &[&str], times: u32) -> Self {
        Self {
            failures: Mutex::new(ids.iter().map(|id| (page_url(id), times)).collect()),
            ..Self::default()
        }
    }

    fn fetched(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.stalled.contains(url) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(url) {
                if *left > 0 {
                    *left = left.saturating_sub(1);
                    return Err(FetchError::HttpStatus(503));
                }
            }
        }

        let id = url.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
        Ok(format!("{} Game|{}", id, id))
    }
}

/// Builds a record from a `<title>|<id>` body
struct PipeParser;

impl RecordParser for PipeParser {
    fn parse(&self, page_url: &str, html: &str) -> Result<GameRecord, ParseError> {
        let (title, id) = html.split_once('|').ok_or(ParseError::MissingTitle)?;
        Ok(GameRecord {
            id: id.to_string(),
            title: title.to_string(),
            page_url: page_url.to_string(),
            version: None,
            size: Some("1 GB".to_string()),
            description: format!("About {}", title),
            cover_image: None,
            screenshots: vec![],
            system_requirements: BTreeMap::new(),
            game_info: BTreeMap::new(),
            download_links: vec![DownloadLink {
                host: "pixeldrain.com".to_string(),
                url: format!("https://pixeldrain.com/u/{}", id),
            }],
        })
    }
}

struct Harness {
    _dir: TempDir,
    store: Arc<SqliteStore>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::new(&dir.path().join("vault.db")).unwrap());
        Self { _dir: dir, store }
    }

    fn scheduler(
        &self,
        listing: FakeListing,
        fetcher: Arc<FakeFetcher>,
        workers: usize,
    ) -> ScrapeScheduler {
        ScrapeScheduler::new(
            Arc::new(listing),
            scraper(fetcher),
            self.store.clone(),
            workers,
            50,
        )
    }

    fn stored_ids(&self) -> Vec<String> {
        self.store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    fn failed_ids(&self) -> Vec<String> {
        self.store
            .list_failed()
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect()
    }
}

fn scraper(fetcher: Arc<FakeFetcher>) -> Arc<PageScraper> {
    Arc::new(PageScraper::new(fetcher, Arc::new(PipeParser)))
}

fn test_config(workers: u32) -> Config {
    Config {
        source: SourceConfig::default(),
        fetch: FetchConfig::default(),
        scraper: ScraperConfig {
            workers,
            retry_workers: 1,
        },
        store: StoreConfig {
            database_path: "unused.db".to_string(),
        },
        resolver: None,
    }
}

// ===== Refresh =====

#[tokio::test]
async fn test_three_pages_with_one_failure() {
    for workers in [2, 4] {
        let harness = Harness::new();
        let listing = FakeListing::of_ids(&[&["a", "b"], &["c", "d"], &["e", "f"]]);
        let fetcher = Arc::new(FakeFetcher::failing(&["f"]));

        let summary = harness
            .scheduler(listing, fetcher, workers)
            .refresh(RefreshMode::Full, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.new, 5, "workers = {}", workers);
        assert_eq!(summary.failed, 1, "workers = {}", workers);
        assert_eq!(summary.failed_ids, vec!["f".to_string()]);
        assert_eq!(harness.stored_ids(), vec!["a", "b", "c", "d", "e"]);

        let failed = harness.store.list_failed().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, "f");
        assert_eq!(failed[0].reason, FailureKind::FetchHttpError);
        assert_eq!(failed[0].attempt_count, 1);
    }
}

#[tokio::test]
async fn test_full_refresh_is_idempotent() {
    let harness = Harness::new();
    let pages: &[&[&str]] = &[&["a", "b"], &["c"]];

    let first = harness
        .scheduler(FakeListing::of_ids(pages), Arc::new(FakeFetcher::default()), 4)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();
    let after_first = harness.store.list_all().unwrap();

    let second = harness
        .scheduler(FakeListing::of_ids(pages), Arc::new(FakeFetcher::default()), 4)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();
    let after_second = harness.store.list_all().unwrap();

    assert_eq!(first.new, 3);
    assert_eq!(second.new, 0);
    assert_eq!(second.unchanged, 3);
    assert_eq!(after_first, after_second);
}

#[tokio::test]
async fn test_failure_isolation_across_worker_counts() {
    let mut outcomes = Vec::new();

    for workers in [1, 2, 8] {
        let harness = Harness::new();
        let listing = FakeListing::of_ids(&[&["a", "b", "c"], &["d", "e", "f", "g"]]);
        let fetcher = Arc::new(FakeFetcher::failing(&["b", "e"]));

        let summary = harness
            .scheduler(listing, fetcher, workers)
            .refresh(RefreshMode::Full, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.new, 5, "workers = {}", workers);
        assert_eq!(summary.failed, 2, "workers = {}", workers);

        let mut failed = harness.failed_ids();
        failed.sort();
        outcomes.push((harness.stored_ids(), failed));
    }

    assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(outcomes[0].0, vec!["a", "c", "d", "f", "g"]);
    assert_eq!(outcomes[0].1, vec!["b", "e"]);
}

#[tokio::test]
async fn test_incremental_refresh_fetches_only_changes() {
    let harness = Harness::new();

    let seed = FakeListing::new(vec![Ok(vec![
        candidate("a", Some("v1")),
        candidate("b", Some("v1")),
        candidate("c", None),
    ])]);
    harness
        .scheduler(seed, Arc::new(FakeFetcher::default()), 2)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    // a bumped, b unchanged, c dropped from the listing, d added
    let listing = FakeListing::new(vec![Ok(vec![
        candidate("a", Some("v2")),
        candidate("b", Some("v1")),
        candidate("d", None),
    ])]);
    let fetcher = Arc::new(FakeFetcher::default());

    let summary = harness
        .scheduler(listing, fetcher.clone(), 2)
        .refresh(RefreshMode::Incremental, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(fetcher.fetched(), vec![page_url("a"), page_url("d")]);
    assert_eq!(summary.new, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.removed_upstream, vec!["c".to_string()]);

    // Removed-upstream records are kept
    assert_eq!(harness.stored_ids(), vec!["a", "b", "c", "d"]);
    let a = harness.store.get("a").unwrap().unwrap();
    assert_eq!(a.version.as_deref(), Some("v2"));
}

#[tokio::test]
async fn test_check_classifies_without_fetching() {
    let harness = Harness::new();
    harness
        .scheduler(
            FakeListing::new(vec![Ok(vec![candidate("a", Some("v1")), candidate("b", None)])]),
            Arc::new(FakeFetcher::default()),
            2,
        )
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    let listing = FakeListing::new(vec![Ok(vec![
        candidate("a", Some("v2")),
        candidate("b", None),
        candidate("c", None),
    ])]);
    let fetcher = Arc::new(FakeFetcher::default());
    let report = harness
        .scheduler(listing, fetcher.clone(), 2)
        .check(&CancellationToken::new())
        .await
        .unwrap();

    assert!(fetcher.fetched().is_empty());
    assert!(report.listing_complete);
    assert_eq!(report.count(ChangeKind::New), 1);
    assert_eq!(report.count(ChangeKind::Updated), 1);
    assert_eq!(report.count(ChangeKind::Unchanged), 1);
    assert!(report.removed_upstream.is_empty());
}

#[tokio::test]
async fn test_listing_failure_keeps_partial_results() {
    let harness = Harness::new();
    harness.store.upsert(&stale_record("old")).unwrap();

    let listing = FakeListing::new(vec![
        Ok(vec![candidate("a", None), candidate("b", None)]),
        Err(FetchError::Timeout),
    ]);

    let result = harness
        .scheduler(listing, Arc::new(FakeFetcher::default()), 2)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await;

    match result {
        Err(VaultError::ListingIncomplete {
            pages_fetched,
            source,
            summary,
        }) => {
            assert_eq!(pages_fetched, 1);
            assert_eq!(source, FetchError::Timeout);
            assert_eq!(summary.new, 2);
            // A partial listing never reports removals
            assert!(summary.removed_upstream.is_empty());
        }
        other => panic!("unexpected result {:?}", other),
    }

    assert_eq!(harness.stored_ids(), vec!["a", "b", "old"]);
}

fn stale_record(id: &str) -> GameRecord {
    PipeParser
        .parse(&page_url(id), &format!("{} Game|{}", id, id))
        .unwrap()
}

// ===== Cancellation =====

#[tokio::test]
async fn test_cancellation_marks_in_flight_and_counts_rest() {
    let harness = Harness::new();
    let listing = FakeListing::of_ids(&[&["slow", "b", "c"]]);
    let fetcher = Arc::new(FakeFetcher {
        stalled: [page_url("slow")].into_iter().collect(),
        ..FakeFetcher::default()
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = harness
        .scheduler(listing, fetcher, 1)
        .refresh(RefreshMode::Full, &cancel)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.not_dispatched, 2);

    let failed = harness.store.list_failed().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].id, "slow");
    assert_eq!(failed[0].reason, FailureKind::Cancelled);
    assert!(harness.stored_ids().is_empty());
}

// ===== Retry =====

#[tokio::test]
async fn test_retry_converges_with_cumulative_attempts() {
    let harness = Harness::new();
    // Fails on the refresh and the first retry, then recovers
    let fetcher = Arc::new(FakeFetcher::failing_times(&["c"], 2));

    harness
        .scheduler(FakeListing::of_ids(&[&["a", "b", "c"]]), fetcher.clone(), 2)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(harness.store.list_failed().unwrap()[0].attempt_count, 1);

    let retry = RetryCoordinator::new(scraper(fetcher), harness.store.clone(), 1);

    let first = retry.retry_failed(&CancellationToken::new()).await.unwrap();
    assert_eq!(first.failed, 1);
    let failed = harness.store.list_failed().unwrap();
    assert_eq!(failed[0].id, "c");
    assert_eq!(failed[0].attempt_count, 2);

    let second = retry.retry_failed(&CancellationToken::new()).await.unwrap();
    assert_eq!(second.new, 1);
    assert_eq!(second.failed, 0);
    assert!(harness.failed_ids().is_empty());
    assert_eq!(harness.stored_ids(), vec!["a", "b", "c"]);

    // Nothing left to retry
    let third = retry.retry_failed(&CancellationToken::new()).await.unwrap();
    assert_eq!(third.processed(), 0);
}

#[tokio::test]
async fn test_retry_keeps_listing_marker() {
    let harness = Harness::new();
    let versioned = || {
        FakeListing::new(vec![Ok(vec![
            candidate("x", Some("v1.0")),
            candidate("y", Some("v1.0")),
        ])])
    };
    let fetcher = Arc::new(FakeFetcher::failing_times(&["x"], 1));

    harness
        .scheduler(versioned(), fetcher.clone(), 2)
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(harness.failed_ids(), vec!["x"]);
    assert_eq!(
        harness.store.list_failed().unwrap()[0].marker.as_deref(),
        Some("v1.0")
    );

    let retried = RetryCoordinator::new(scraper(fetcher), harness.store.clone(), 1)
        .retry_failed(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(retried.new, 1);

    let x = harness.store.get("x").unwrap().unwrap();
    assert_eq!(x.version.as_deref(), Some("v1.0"));

    // Same listing again: nothing looks updated, so nothing is fetched
    let fetcher = Arc::new(FakeFetcher::default());
    let summary = harness
        .scheduler(versioned(), fetcher.clone(), 2)
        .refresh(RefreshMode::Incremental, &CancellationToken::new())
        .await
        .unwrap();

    assert!(fetcher.fetched().is_empty());
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.unchanged, 2);
}

// ===== Run Bookkeeping =====

#[tokio::test]
async fn test_coordinator_records_runs() {
    let harness = Harness::new();
    let fetcher = Arc::new(FakeFetcher::failing(&["b"]));
    let coordinator = Coordinator::new(
        Arc::new(FakeListing::of_ids(&[&["a", "b"]])),
        scraper(fetcher),
        harness.store.clone(),
        &test_config(2),
        "hash-1",
    );

    coordinator
        .refresh(RefreshMode::Incremental, &CancellationToken::new())
        .await
        .unwrap();
    coordinator.retry(&CancellationToken::new()).await.unwrap();

    let runs = harness.store.latest_runs(5).unwrap();
    assert_eq!(runs.len(), 2);

    assert_eq!(runs[0].kind, RunKind::Retry);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].counts.failed, 1);

    assert_eq!(runs[1].kind, RunKind::Update);
    assert_eq!(runs[1].status, RunStatus::Completed);
    assert_eq!(runs[1].config_hash, "hash-1");
    assert_eq!(runs[1].counts.new, 1);
    assert_eq!(runs[1].counts.failed, 1);
    assert!(runs[1].finished_at.is_some());
}

#[tokio::test]
async fn test_coordinator_records_incomplete_listing() {
    let harness = Harness::new();
    let listing = FakeListing::new(vec![
        Ok(vec![candidate("a", None)]),
        Err(FetchError::Network("connection reset".to_string())),
    ]);
    let coordinator = Coordinator::new(
        Arc::new(listing),
        scraper(Arc::new(FakeFetcher::default())),
        harness.store.clone(),
        &test_config(2),
        "hash-2",
    );

    let result = coordinator
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(VaultError::ListingIncomplete { .. })));

    let run = &harness.store.latest_runs(1).unwrap()[0];
    assert_eq!(run.kind, RunKind::Refresh);
    assert_eq!(run.status, RunStatus::Incomplete);
    assert_eq!(run.counts.new, 1);
}

/// SQLite store whose Nth `commit_success` fails
struct FailingStore {
    inner: Arc<SqliteStore>,
    fail_on: u32,
    commits: AtomicU32,
}

impl Store for FailingStore {
    fn upsert(&self, record: &GameRecord) -> StorageResult<UpsertOutcome> {
        self.inner.upsert(record)
    }

    fn get(&self, id: &str) -> StorageResult<Option<GameRecord>> {
        self.inner.get(id)
    }

    fn list_all(&self) -> StorageResult<Vec<GameRecord>> {
        self.inner.list_all()
    }

    fn stored_markers(&self) -> StorageResult<BTreeMap<String, Option<String>>> {
        self.inner.stored_markers()
    }

    fn search(&self, query: &str) -> StorageResult<Vec<GameRecord>> {
        self.inner.search(query)
    }

    fn find_incomplete(&self) -> StorageResult<Vec<GameRecord>> {
        self.inner.find_incomplete()
    }

    fn mark_failed(
        &self,
        id: &str,
        source_url: &str,
        marker: Option<&str>,
        reason: FailureKind,
        detail: &str,
    ) -> StorageResult<()> {
        self.inner.mark_failed(id, source_url, marker, reason, detail)
    }

    fn clear_failed(&self, id: &str) -> StorageResult<()> {
        self.inner.clear_failed(id)
    }

    fn list_failed(&self) -> StorageResult<Vec<FailedEntry>> {
        self.inner.list_failed()
    }

    fn commit_success(&self, record: &GameRecord) -> StorageResult<UpsertOutcome> {
        let n = self.commits.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        self.inner.commit_success(record)
    }

    fn delete_all(&self) -> StorageResult<()> {
        self.inner.delete_all()
    }

    fn create_run(&self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(kind, config_hash)
    }

    fn finish_run(&self, run_id: i64, status: RunStatus, counts: &RunCounts) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, counts)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn latest_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        self.inner.latest_runs(limit)
    }

    fn count_records(&self) -> StorageResult<u64> {
        self.inner.count_records()
    }

    fn count_download_links(&self) -> StorageResult<u64> {
        self.inner.count_download_links()
    }

    fn count_failed_by_reason(&self) -> StorageResult<BTreeMap<FailureKind, u64>> {
        self.inner.count_failed_by_reason()
    }
}

#[tokio::test]
async fn test_store_write_error_aborts_run() {
    let harness = Harness::new();
    let store = Arc::new(FailingStore {
        inner: harness.store.clone(),
        fail_on: 3,
        commits: AtomicU32::new(0),
    });
    let coordinator = Coordinator::new(
        Arc::new(FakeListing::of_ids(&[&["a", "b", "c", "d", "e"]])),
        scraper(Arc::new(FakeFetcher::default())),
        store,
        &test_config(1),
        "hash-3",
    );

    let result = coordinator
        .refresh(RefreshMode::Full, &CancellationToken::new())
        .await;
    assert!(
        matches!(result, Err(VaultError::Storage(StorageError::Database(_)))),
        "unexpected result {:?}",
        result
    );

    // Commits before the failing write stay durable; nothing after it runs
    assert_eq!(harness.stored_ids(), vec!["a", "b"]);
    assert!(harness.failed_ids().is_empty());

    let run = &harness.store.latest_runs(1).unwrap()[0];
    assert_eq!(run.kind, RunKind::Refresh);
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
}
