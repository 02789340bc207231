//! Coordinator - wires the pipeline together and keeps run history
//!
//! This module contains the entry points the CLI drives:
//! - Building the fetcher, listing source, parser and pool from configuration
//! - Recording each refresh or retry as a run with its final status and counts
//! - Running the standalone update check

use crate::config::Config;
use crate::crawler::fetcher::{HttpFetcher, PageFetcher};
use crate::crawler::listing::{HttpListingSource, ListingSource};
use crate::crawler::parser::GamePageParser;
use crate::crawler::pool::PageScraper;
use crate::crawler::retry::RetryCoordinator;
use crate::crawler::scheduler::{RefreshMode, ScrapeScheduler};
use crate::diff::DiffReport;
use crate::output::RunSummary;
use crate::storage::{RunCounts, RunKind, RunStatus, Store};
use crate::VaultError;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Main pipeline coordinator
pub struct Coordinator {
    store: Arc<dyn Store>,
    scheduler: ScrapeScheduler,
    retry: RetryCoordinator,
    config_hash: String,
}

impl Coordinator {
    /// Creates a coordinator from explicit components
    ///
    /// # Arguments
    ///
    /// * `listing` - Source of candidates
    /// * `scraper` - Fetch-then-parse pipeline shared by refresh and retry
    /// * `store` - The store every component writes to
    /// * `config` - Pool sizes and listing limits
    /// * `config_hash` - Recorded with every run
    pub fn new(
        listing: Arc<dyn ListingSource>,
        scraper: Arc<PageScraper>,
        store: Arc<dyn Store>,
        config: &Config,
        config_hash: &str,
    ) -> Self {
        let scheduler = ScrapeScheduler::new(
            listing,
            Arc::clone(&scraper),
            Arc::clone(&store),
            config.scraper.workers as usize,
            config.source.max_listing_pages,
        );
        let retry = RetryCoordinator::new(
            scraper,
            Arc::clone(&store),
            config.scraper.retry_workers as usize,
        );

        Self {
            store,
            scheduler,
            retry,
            config_hash: config_hash.to_string(),
        }
    }

    /// Creates a coordinator that scrapes over HTTP
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(VaultError)` - The HTTP client or a configured URL was invalid
    pub fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        config_hash: &str,
    ) -> Result<Self, VaultError> {
        let fetcher: Arc<dyn PageFetcher> =
            Arc::new(HttpFetcher::from_config(&config.source, &config.fetch)?);
        let listing = Arc::new(HttpListingSource::from_config(
            Arc::clone(&fetcher),
            &config.source,
        )?);
        let scraper = Arc::new(PageScraper::new(fetcher, Arc::new(GamePageParser::new())));

        Ok(Self::new(listing, scraper, store, config, config_hash))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Runs a refresh and records it in the run history
    pub async fn refresh(
        &self,
        mode: RefreshMode,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, VaultError> {
        let kind = match mode {
            RefreshMode::Full => RunKind::Refresh,
            RefreshMode::Incremental => RunKind::Update,
        };
        self.tracked(kind, self.scheduler.refresh(mode, cancel))
            .await
    }

    /// Retries the failed set and records it in the run history
    pub async fn retry(&self, cancel: &CancellationToken) -> Result<RunSummary, VaultError> {
        self.tracked(RunKind::Retry, self.retry.retry_failed(cancel))
            .await
    }

    /// Classifies the current listing against the store; nothing is written
    pub async fn check(&self, cancel: &CancellationToken) -> Result<DiffReport, VaultError> {
        self.scheduler.check(cancel).await
    }

    /// Wraps a run with `create_run` and `finish_run`
    async fn tracked<F>(&self, kind: RunKind, run: F) -> Result<RunSummary, VaultError>
    where
        F: Future<Output = Result<RunSummary, VaultError>>,
    {
        let run_id = self.store.create_run(kind, &self.config_hash)?;
        info!(run_id, kind = kind.to_db_string(), "Run started");

        let result = run.await;

        let (status, counts) = match &result {
            Ok(summary) if summary.cancelled => (RunStatus::Cancelled, summary.counts()),
            Ok(summary) => (RunStatus::Completed, summary.counts()),
            Err(VaultError::ListingIncomplete { summary, .. }) if summary.cancelled => {
                (RunStatus::Cancelled, summary.counts())
            }
            Err(VaultError::ListingIncomplete { summary, .. }) => {
                (RunStatus::Incomplete, summary.counts())
            }
            Err(_) => (RunStatus::Failed, RunCounts::default()),
        };

        // The run's own error, if any, matters more than a failed bookkeeping write
        if let Err(e) = self.store.finish_run(run_id, status, &counts) {
            warn!(run_id, error = %e, "Failed to record run outcome");
        }
        info!(run_id, status = status.to_db_string(), "Run finished");

        result
    }
}
