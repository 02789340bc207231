//! State module for classifying games and failures
//!
//! # Components
//!
//! - `FailureKind`: Why a scrape attempt for a game failed (recorded in the failed set)
//! - `ChangeKind`: How a listed game relates to the local store (new, updated, ...)

mod change;
mod failure;

// Re-export main types
pub use change::ChangeKind;
pub use failure::FailureKind;
