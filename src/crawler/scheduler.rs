//! Scrape scheduler for full and incremental refreshes
//!
//! This module handles:
//! - Walking the listing into a candidate set
//! - Classifying candidates against the store
//! - Choosing what to fetch for the refresh mode
//! - Handing the work to the bounded pool

use crate::crawler::listing::{crawl_listing, ListingSource};
use crate::crawler::pool::{run_pool, PageScraper, WorkItem};
use crate::diff::{DiffDetector, DiffReport};
use crate::output::RunSummary;
use crate::storage::Store;
use crate::VaultError;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which candidates a refresh fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Re-fetch every listed game
    Full,

    /// Fetch only new games and games whose marker changed
    Incremental,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => f.write_str("full"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// Discovers candidates and drives them through the scrape pipeline
pub struct ScrapeScheduler {
    listing: Arc<dyn ListingSource>,
    scraper: Arc<PageScraper>,
    store: Arc<dyn Store>,
    workers: usize,
    max_listing_pages: u32,
}

impl ScrapeScheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `listing` - Source of candidates
    /// * `scraper` - Fetch-then-parse pipeline for one game page
    /// * `store` - Where outcomes are written
    /// * `workers` - Pool size
    /// * `max_listing_pages` - Upper bound on listing pages walked
    pub fn new(
        listing: Arc<dyn ListingSource>,
        scraper: Arc<PageScraper>,
        store: Arc<dyn Store>,
        workers: usize,
        max_listing_pages: u32,
    ) -> Self {
        Self {
            listing,
            scraper,
            store,
            workers: workers.max(1),
            max_listing_pages,
        }
    }

    /// Walks the listing and classifies it without fetching any game page
    ///
    /// A partial listing still yields a report; its `listing_complete` flag is
    /// false and no removed-upstream identifiers are computed.
    pub async fn check(&self, cancel: &CancellationToken) -> Result<DiffReport, VaultError> {
        let crawl = crawl_listing(self.listing.as_ref(), self.max_listing_pages, cancel).await;
        let report =
            DiffDetector::classify(&crawl.candidates, self.store.as_ref(), crawl.is_complete())?;

        if let Some(e) = &crawl.error {
            warn!(
                pages = crawl.pages_fetched,
                error = %e,
                "Listing incomplete, report covers the pages fetched"
            );
        }
        Ok(report)
    }

    /// Runs a full or incremental refresh
    ///
    /// A listing failure does not stop the run: whatever the crawl collected
    /// is still processed, and the result is then
    /// [`VaultError::ListingIncomplete`] carrying the summary.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - Every dispatched candidate reached a terminal state
    /// * `Err(VaultError::ListingIncomplete)` - The listing crawl stopped early
    /// * `Err(VaultError::Storage)` - A store write failed; the run was aborted
    pub async fn refresh(
        &self,
        mode: RefreshMode,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, VaultError> {
        info!(%mode, workers = self.workers, "Starting refresh");

        let crawl = crawl_listing(self.listing.as_ref(), self.max_listing_pages, cancel).await;
        let report =
            DiffDetector::classify(&crawl.candidates, self.store.as_ref(), crawl.is_complete())?;

        let (items, skipped): (Vec<WorkItem>, u64) = match mode {
            RefreshMode::Full => (crawl.candidates.iter().map(WorkItem::from).collect(), 0),
            RefreshMode::Incremental => {
                let items: Vec<WorkItem> = report.needs_fetch().map(WorkItem::from).collect();
                let skipped = (crawl.candidates.len() - items.len()) as u64;
                (items, skipped)
            }
        };

        info!(
            candidates = crawl.candidates.len(),
            to_fetch = items.len(),
            skipped,
            "Candidates classified"
        );

        let mut summary = run_pool(
            items,
            self.workers,
            Arc::clone(&self.scraper),
            self.store.as_ref(),
            cancel,
        )
        .await?;

        summary.unchanged += skipped;
        summary.removed_upstream = report.removed_upstream;

        match crawl.error {
            Some(source) => Err(VaultError::ListingIncomplete {
                pages_fetched: crawl.pages_fetched,
                source,
                summary: Box::new(summary),
            }),
            None => Ok(summary),
        }
    }
}
