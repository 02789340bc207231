//! Core data types shared by the scraper, the store and the diff detector
//!
//! A [`GameRecord`] is what one successful page scrape produces. A [`Candidate`]
//! is what the listing crawl produces for one game before its page is fetched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// A download link as published on a game page
///
/// `url` is the hoster's landing page, not a direct file URL. Resolving it to a
/// direct URL happens lazily through [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    /// Hoster label (e.g. "pixeldrain.com")
    pub host: String,

    /// Page URL on the hoster
    pub url: String,
}

/// One game as stored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Stable identifier derived from the canonical page URL slug
    pub id: String,

    /// Cleaned game title
    pub title: String,

    /// Canonical page URL the record was scraped from
    pub page_url: String,

    /// Update marker (version or build) when the source exposes one
    ///
    /// When the listing shows a marker for the game, that marker is stored
    /// here instead of the version found on the page, so later diffs compare
    /// listing marker against listing marker.
    pub version: Option<String>,

    /// Download size as published
    pub size: Option<String>,

    /// Description paragraphs joined by newlines
    pub description: String,

    pub cover_image: Option<String>,

    pub screenshots: Vec<String>,

    pub system_requirements: BTreeMap<String, String>,

    pub game_info: BTreeMap<String, String>,

    /// Download links in page order
    pub download_links: Vec<DownloadLink>,
}

impl GameRecord {
    /// Returns true if the record is missing data a usable entry must have
    pub fn is_incomplete(&self) -> bool {
        self.title.trim().is_empty() || self.download_links.is_empty()
    }
}

/// A game discovered by the listing crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub source_url: String,
    pub title: String,

    /// Update marker visible on the listing, if any
    pub marker: Option<String>,
}

/// Ordered, identifier-unique sequence of candidates from one listing crawl
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: Vec<Candidate>,
    seen: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a candidate unless its identifier was already seen
    ///
    /// Returns false for duplicates; the first occurrence wins.
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if !self.seen.insert(candidate.id.clone()) {
            return false;
        }
        self.entries.push(candidate);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.entries
    }
}

impl FromIterator<Candidate> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = Candidate>>(iter: I) -> Self {
        let mut set = Self::new();
        for candidate in iter {
            set.push(candidate);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, url: &str) -> Candidate {
        Candidate {
            id: id.to_string(),
            source_url: url.to_string(),
            title: id.to_string(),
            marker: None,
        }
    }

    #[test]
    fn test_candidate_set_keeps_first_duplicate() {
        let mut set = CandidateSet::new();
        assert!(set.push(candidate("a", "https://example.com/a")));
        assert!(!set.push(candidate("a", "https://example.com/a-again")));
        assert!(set.push(candidate("b", "https://example.com/b")));

        assert_eq!(set.len(), 2);
        let urls: Vec<_> = set.iter().map(|c| c.source_url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_candidate_set_preserves_order() {
        let set: CandidateSet = ["c", "a", "b"]
            .iter()
            .map(|id| candidate(id, "https://example.com/"))
            .collect();
        let ids: Vec<_> = set.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert!(set.contains("a"));
        assert!(!set.contains("z"));
    }

    #[test]
    fn test_incomplete_record() {
        let mut record = GameRecord {
            id: "game".to_string(),
            title: "Game".to_string(),
            page_url: "https://example.com/game/".to_string(),
            version: None,
            size: None,
            description: String::new(),
            cover_image: None,
            screenshots: vec![],
            system_requirements: BTreeMap::new(),
            game_info: BTreeMap::new(),
            download_links: vec![],
        };
        assert!(record.is_incomplete());

        record.download_links.push(DownloadLink {
            host: "example.org".to_string(),
            url: "https://example.org/f/1".to_string(),
        });
        assert!(!record.is_incomplete());

        record.title = "  ".to_string();
        assert!(record.is_incomplete());
    }
}
