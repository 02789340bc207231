//! Crawler module for listing and game page scraping
//!
//! This module contains the core scrape-and-persist logic, including:
//! - HTTP fetching with bounded retry
//! - Listing pagination and game page parsing
//! - The bounded worker pool and its single store writer
//! - Full and incremental refreshes, targeted retries and run bookkeeping

mod backoff;
mod coordinator;
mod fetcher;
mod listing;
mod parser;
mod pool;
mod retry;
mod scheduler;

pub use backoff::{retry_with_backoff, RetryPolicy};
pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, FetchError, HttpFetcher, PageFetcher};
pub use listing::{
    crawl_listing, HttpListingSource, ListingCrawl, ListingPage, ListingSource, PAGE_PLACEHOLDER,
};
pub use parser::{parse_listing, GamePageParser, ParseError, RecordParser};
pub use pool::{run_pool, ItemOutcome, PageScraper, WorkItem};
pub use retry::RetryCoordinator;
pub use scheduler::{RefreshMode, ScrapeScheduler};
