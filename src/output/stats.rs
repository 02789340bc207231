//! Statistics generation from the store
//!
//! This module provides functionality for extracting and displaying
//! store statistics and recent run history.

use crate::state::FailureKind;
use crate::storage::{RunRecord, Store};
use crate::VaultError;
use std::collections::BTreeMap;

/// How many past runs the statistics include
const RECENT_RUNS: usize = 5;

/// Store statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of stored games
    pub total_games: u64,

    /// Total number of stored download links
    pub total_links: u64,

    /// Games missing a title or download links
    pub incomplete_games: u64,

    /// Failed entries grouped by reason
    pub failed_by_reason: BTreeMap<FailureKind, u64>,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

impl StoreStatistics {
    pub fn total_failed(&self) -> u64 {
        self.failed_by_reason.values().sum()
    }
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(VaultError)` - Failed to query statistics
pub fn load_statistics(store: &dyn Store) -> Result<StoreStatistics, VaultError> {
    let total_games = store.count_records()?;
    let total_links = store.count_download_links()?;
    let incomplete_games = store.find_incomplete()?.len() as u64;
    let failed_by_reason = store.count_failed_by_reason()?;
    let recent_runs = store.latest_runs(RECENT_RUNS)?;

    Ok(StoreStatistics {
        total_games,
        total_links,
        incomplete_games,
        failed_by_reason,
        recent_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Games stored: {}", stats.total_games);
    println!("  Download links: {}", stats.total_links);
    println!("  Incomplete games: {}", stats.incomplete_games);
    println!();

    if !stats.failed_by_reason.is_empty() {
        println!("Failed Entries ({}):", stats.total_failed());
        let mut reason_counts: Vec<_> = stats.failed_by_reason.iter().collect();
        reason_counts.sort_by(|a, b| b.1.cmp(a.1));

        for (reason, count) in reason_counts {
            println!("  {}: {}", reason, count);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs:");
        for run in &stats.recent_runs {
            println!(
                "  #{} {} {} [{}] new={} updated={} unchanged={} failed={} not-dispatched={}",
                run.id,
                run.kind.to_db_string(),
                run.started_at,
                run.status.to_db_string(),
                run.counts.new,
                run.counts.updated,
                run.counts.unchanged,
                run.counts.failed,
                run.counts.not_dispatched
            );
        }
        println!();
    }

    let attempted = stats.total_games + stats.total_failed();
    let success_rate = if attempted > 0 {
        (stats.total_games as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} games stored)",
        success_rate, stats.total_games, attempted
    );
}
