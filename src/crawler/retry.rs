//! Targeted retry of the failed set

use crate::crawler::pool::{run_pool, PageScraper, WorkItem};
use crate::output::RunSummary;
use crate::storage::Store;
use crate::VaultError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Re-submits failed identifiers through the same per-item pipeline
///
/// Successes move out of the failed set in the same transaction that stores
/// the record; failures stay with an incremented attempt count.
pub struct RetryCoordinator {
    scraper: Arc<PageScraper>,
    store: Arc<dyn Store>,
    workers: usize,
}

impl RetryCoordinator {
    pub fn new(scraper: Arc<PageScraper>, store: Arc<dyn Store>, workers: usize) -> Self {
        Self {
            scraper,
            store,
            workers: workers.max(1),
        }
    }

    /// Retries every entry in the failed set
    pub async fn retry_failed(&self, cancel: &CancellationToken) -> Result<RunSummary, VaultError> {
        let items: Vec<WorkItem> = self
            .store
            .list_failed()?
            .into_iter()
            .map(WorkItem::from)
            .collect();

        if items.is_empty() {
            info!("Failed set is empty, nothing to retry");
            return Ok(RunSummary::default());
        }

        info!(items = items.len(), workers = self.workers, "Retrying failed entries");

        let summary = run_pool(
            items,
            self.workers,
            Arc::clone(&self.scraper),
            self.store.as_ref(),
            cancel,
        )
        .await?;

        Ok(summary)
    }
}
