//! Listing crawl
//!
//! Walks the paginated game listing and collects an ordered, de-duplicated
//! candidate set. A listing failure stops pagination but keeps what was
//! already collected.

use crate::config::SourceConfig;
use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::crawler::parser::parse_listing;
use crate::model::{Candidate, CandidateSet};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Placeholder replaced by the 1-based page number in the listing URL
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// One page of listing results
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub entries: Vec<Candidate>,

    /// Whether a following page may hold more entries
    pub has_more: bool,
}

/// A paginated source of game candidates
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches listing page `page` (1-based)
    async fn fetch_page(&self, page: u32) -> Result<ListingPage, FetchError>;
}

/// Listing served over HTTP and parsed with [`parse_listing`]
///
/// With a `{page}` placeholder in the URL the listing is paginated, and a 404
/// past the first page marks its end. Without one the listing is one page.
pub struct HttpListingSource {
    fetcher: Arc<dyn PageFetcher>,
    listing_url: String,
    base_url: Url,
}

impl HttpListingSource {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        listing_url: &str,
        base_url: &str,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            fetcher,
            listing_url: listing_url.to_string(),
            base_url: Url::parse(base_url)?,
        })
    }

    /// Builds the source from the `[source]` section
    pub fn from_config(
        fetcher: Arc<dyn PageFetcher>,
        config: &SourceConfig,
    ) -> Result<Self, url::ParseError> {
        Self::new(fetcher, &config.listing_url, &config.base_url)
    }

    fn is_paginated(&self) -> bool {
        self.listing_url.contains(PAGE_PLACEHOLDER)
    }

    /// URL of listing page `page`, or None past the end of a single-page listing
    pub fn page_url(&self, page: u32) -> Option<String> {
        if self.is_paginated() {
            Some(self.listing_url.replace(PAGE_PLACEHOLDER, &page.to_string()))
        } else if page == 1 {
            Some(self.listing_url.clone())
        } else {
            None
        }
    }
}

#[async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_page(&self, page: u32) -> Result<ListingPage, FetchError> {
        let Some(url) = self.page_url(page) else {
            return Ok(ListingPage::default());
        };

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(FetchError::HttpStatus(404)) if page > 1 => {
                debug!(page, "Listing page not found, treating as end of listing");
                return Ok(ListingPage::default());
            }
            Err(e) => return Err(e),
        };

        let entries = parse_listing(&html, &self.base_url);
        let has_more = self.is_paginated() && !entries.is_empty();
        Ok(ListingPage { entries, has_more })
    }
}

/// Result of walking the listing
#[derive(Debug, Default)]
pub struct ListingCrawl {
    pub candidates: CandidateSet,

    /// Pages fetched successfully
    pub pages_fetched: u32,

    /// The fetch failure that stopped pagination, if any
    pub error: Option<FetchError>,

    /// Pagination stopped at the page limit or on cancellation while more
    /// pages were announced
    pub truncated: bool,
}

impl ListingCrawl {
    /// True when the candidate set reflects the whole listing
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && !self.truncated
    }
}

/// Walks listing pages 1, 2, ... until a page is empty, reports no
/// continuation, fails, or `max_pages` is reached
///
/// # Arguments
///
/// * `source` - The listing to walk
/// * `max_pages` - Upper bound on pages fetched
/// * `cancel` - Stops pagination between pages when cancelled
pub async fn crawl_listing(
    source: &dyn ListingSource,
    max_pages: u32,
    cancel: &CancellationToken,
) -> ListingCrawl {
    let mut crawl = ListingCrawl::default();
    let mut page = 1;

    loop {
        if cancel.is_cancelled() {
            crawl.truncated = true;
            break;
        }

        if page > max_pages {
            warn!(max_pages, "Listing page limit reached");
            crawl.truncated = true;
            break;
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                crawl.truncated = true;
                break;
            }
            result = source.fetch_page(page) => result,
        };

        let listing_page = match result {
            Ok(listing_page) => listing_page,
            Err(e) => {
                warn!(page, error = %e, "Listing crawl stopped");
                crawl.error = Some(e);
                break;
            }
        };

        crawl.pages_fetched += 1;
        if listing_page.entries.is_empty() {
            break;
        }

        let found = listing_page.entries.len();
        let mut added = 0;
        for candidate in listing_page.entries {
            if crawl.candidates.push(candidate) {
                added += 1;
            }
        }
        debug!(page, found, added, "Listing page parsed");

        if !listing_page.has_more {
            break;
        }
        page += 1;
    }

    info!(
        pages = crawl.pages_fetched,
        candidates = crawl.candidates.len(),
        complete = crawl.is_complete(),
        "Listing crawl finished"
    );
    crawl
}
