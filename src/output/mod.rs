//! Output module for run summaries and reports
//!
//! This module handles:
//! - The summary value a refresh or retry returns
//! - Store statistics and run history
//! - Printing records, failures and diff reports for the CLI

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, StoreStatistics};
pub use summary::RunSummary;

use crate::diff::DiffReport;
use crate::model::GameRecord;
use crate::state::ChangeKind;
use crate::storage::FailedEntry;

/// Prints one line per record
pub fn print_record_list(records: &[GameRecord]) {
    for record in records {
        let version = record.version.as_deref().unwrap_or("-");
        println!("{:<50} {:<20} {}", record.id, version, record.title);
    }
    println!("\n{} game(s)", records.len());
}

/// Prints a record with all of its metadata
pub fn print_record(record: &GameRecord) {
    println!("{}", record.title);
    println!("  id:      {}", record.id);
    println!("  page:    {}", record.page_url);
    if let Some(version) = &record.version {
        println!("  version: {}", version);
    }
    if let Some(size) = &record.size {
        println!("  size:    {}", size);
    }
    if let Some(cover) = &record.cover_image {
        println!("  cover:   {}", cover);
    }

    if !record.description.is_empty() {
        println!("\n{}", record.description);
    }

    if !record.system_requirements.is_empty() {
        println!("\nSystem Requirements:");
        for (key, value) in &record.system_requirements {
            println!("  {}: {}", key, value);
        }
    }

    if !record.game_info.is_empty() {
        println!("\nGame Info:");
        for (key, value) in &record.game_info {
            println!("  {}: {}", key, value);
        }
    }

    if !record.screenshots.is_empty() {
        println!("\nScreenshots:");
        for url in &record.screenshots {
            println!("  {}", url);
        }
    }

    println!("\nDownload Links:");
    for (index, link) in record.download_links.iter().enumerate() {
        println!("  [{}] {} {}", index, link.host, link.url);
    }
}

/// Prints the failed set
pub fn print_failed(entries: &[FailedEntry]) {
    if entries.is_empty() {
        println!("No failed entries.");
        return;
    }

    for entry in entries {
        println!(
            "{} [{}] attempts={} last={}",
            entry.id, entry.reason, entry.attempt_count, entry.last_attempt_at
        );
        println!("    {}", entry.source_url);
        if !entry.detail.is_empty() {
            println!("    {}", entry.detail);
        }
    }
    println!("\n{} failed entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

/// Prints a diff report without fetching any game page
pub fn print_diff_report(report: &DiffReport) {
    println!("=== Update Check ===\n");
    println!("  New:       {}", report.count(ChangeKind::New));
    println!("  Updated:   {}", report.count(ChangeKind::Updated));
    println!("  Unchanged: {}", report.count(ChangeKind::Unchanged));

    for kind in [ChangeKind::New, ChangeKind::Updated] {
        let candidates: Vec<_> = report.of_kind(kind).collect();
        if candidates.is_empty() {
            continue;
        }
        println!("\n{} ({}):", kind, candidates.len());
        for candidate in candidates {
            match &candidate.marker {
                Some(marker) => println!("  - {} [{}]", candidate.title, marker),
                None => println!("  - {}", candidate.title),
            }
        }
    }

    if !report.listing_complete {
        println!("\nListing crawl was incomplete; removed-upstream check skipped.");
    } else if !report.removed_upstream.is_empty() {
        println!(
            "\n{} ({}):",
            ChangeKind::RemovedUpstream,
            report.removed_upstream.len()
        );
        for id in &report.removed_upstream {
            println!("  - {}", id);
        }
    }
}
