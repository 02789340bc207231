//! Failure reason tags recorded in the failed set
//!
//! The tag separates fetch failures from parse failures so an operator can
//! tell a flaky host from a markup change at a glance.

use std::fmt;

/// Why a scrape attempt for one game did not produce a usable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    // ===== Fetch Failures =====
    /// The page request timed out on every attempt
    FetchTimeout,

    /// The server answered with a non-success HTTP status
    FetchHttpError,

    /// Connection, DNS, TLS or body read failure
    FetchNetworkError,

    // ===== Content Failures =====
    /// The page was fetched but did not yield a usable record
    ParseError,

    /// A stored record was flagged as incomplete by a quickcheck
    Incomplete,

    /// The worker scraping the item panicked
    WorkerPanic,

    // ===== Run Control =====
    /// The item was in flight when the run was cancelled
    Cancelled,
}

impl FailureKind {
    /// Returns true if the failure came from the network layer
    pub fn is_fetch(&self) -> bool {
        matches!(
            self,
            Self::FetchTimeout | Self::FetchHttpError | Self::FetchNetworkError
        )
    }

    /// Converts the failure kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::FetchTimeout => "fetch-timeout",
            Self::FetchHttpError => "fetch-http-error",
            Self::FetchNetworkError => "fetch-network-error",
            Self::ParseError => "parse-error",
            Self::Incomplete => "incomplete",
            Self::WorkerPanic => "worker-panic",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a failure kind from its database string representation
    ///
    /// Returns None if the string doesn't match any known kind.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "fetch-timeout" => Some(Self::FetchTimeout),
            "fetch-http-error" => Some(Self::FetchHttpError),
            "fetch-network-error" => Some(Self::FetchNetworkError),
            "parse-error" => Some(Self::ParseError),
            "incomplete" => Some(Self::Incomplete),
            "worker-panic" => Some(Self::WorkerPanic),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all failure kinds
    pub fn all() -> [Self; 7] {
        [
            Self::FetchTimeout,
            Self::FetchHttpError,
            Self::FetchNetworkError,
            Self::ParseError,
            Self::Incomplete,
            Self::WorkerPanic,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
