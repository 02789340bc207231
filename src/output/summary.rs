//! Per-run outcome summary

use crate::storage::{RunCounts, UpsertOutcome};
use serde::Serialize;

/// What one refresh or retry run did
///
/// `new`, `updated` and `unchanged` come from the store's view of each
/// committed record; candidates skipped by an incremental refresh count as
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub new: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,

    /// Identifiers that ended the run in the failed set, in completion order
    pub failed_ids: Vec<String>,

    /// Stored identifiers missing from a complete listing
    pub removed_upstream: Vec<String>,

    /// Work items never handed to a worker because the run was cancelled
    pub not_dispatched: u64,

    pub cancelled: bool,
}

impl RunSummary {
    /// Counts a committed record
    pub fn record_success(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.new += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
        }
    }

    /// Counts a terminal failure
    pub fn record_failure(&mut self, id: &str) {
        self.failed += 1;
        self.failed_ids.push(id.to_string());
    }

    /// Items that reached a terminal state
    pub fn processed(&self) -> u64 {
        self.new + self.updated + self.unchanged + self.failed
    }

    /// Counts persisted with the run record
    pub fn counts(&self) -> RunCounts {
        RunCounts {
            new: self.new,
            updated: self.updated,
            unchanged: self.unchanged,
            failed: self.failed,
            not_dispatched: self.not_dispatched,
        }
    }

    /// Prints the summary to stdout
    pub fn print(&self) {
        println!("=== Run Summary ===\n");
        println!("  New:       {}", self.new);
        println!("  Updated:   {}", self.updated);
        println!("  Unchanged: {}", self.unchanged);
        println!("  Failed:    {}", self.failed);

        if self.cancelled {
            println!(
                "\nRun cancelled; {} item(s) were never dispatched",
                self.not_dispatched
            );
        }

        if !self.failed_ids.is_empty() {
            println!("\nFailed ({}):", self.failed_ids.len());
            for id in &self.failed_ids {
                println!("  - {}", id);
            }
            println!("\nRun `gamevault retry` to try them again.");
        }

        if !self.removed_upstream.is_empty() {
            println!(
                "\nNo longer listed upstream ({}), kept locally:",
                self.removed_upstream.len()
            );
            for id in &self.removed_upstream {
                println!("  - {}", id);
            }
        }
    }
}
