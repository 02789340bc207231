use std::fmt;

/// How a listed game relates to what the store already holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Not in the store yet
    New,

    /// In the store, but the listing shows a different update marker
    Updated,

    /// In the store with the same marker (or the listing exposes none)
    Unchanged,

    /// In the store, but no longer on the listing
    RemovedUpstream,
}

impl ChangeKind {
    /// Returns true if the game's page has to be fetched to bring the store up to date
    pub fn needs_fetch(&self) -> bool {
        matches!(self, Self::New | Self::Updated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::RemovedUpstream => "removed-upstream",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
