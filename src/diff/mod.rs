//! Change detection between a listing crawl and the store
//!
//! Classifies each candidate as new, updated or unchanged, and finds stored
//! games the listing no longer shows. Nothing here fetches a game page or
//! writes to the store.

use crate::model::{Candidate, CandidateSet};
use crate::state::ChangeKind;
use crate::storage::{StorageResult, Store};
use std::collections::BTreeMap;

/// Candidates in listing order, each with its classification
#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub entries: Vec<(Candidate, ChangeKind)>,

    /// Stored identifiers absent from the listing, ordered by identifier
    ///
    /// Always empty when the listing crawl was partial.
    pub removed_upstream: Vec<String>,

    pub listing_complete: bool,
}

impl DiffReport {
    /// Candidates with the given classification, in listing order
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Candidate> + '_ {
        self.entries
            .iter()
            .filter(move |(_, k)| *k == kind)
            .map(|(candidate, _)| candidate)
    }

    pub fn count(&self, kind: ChangeKind) -> usize {
        if kind == ChangeKind::RemovedUpstream {
            return self.removed_upstream.len();
        }
        self.of_kind(kind).count()
    }

    /// Candidates an incremental refresh must fetch, in listing order
    pub fn needs_fetch(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.entries
            .iter()
            .filter(|(_, kind)| kind.needs_fetch())
            .map(|(candidate, _)| candidate)
    }
}

/// Classifies listing candidates against stored records
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffDetector;

impl DiffDetector {
    /// Classifies every candidate
    ///
    /// - absent from the store: new
    /// - present, the listing shows a marker, and it differs from the stored
    ///   one: updated
    /// - otherwise: unchanged
    ///
    /// Stored identifiers missing from `candidates` are reported as removed
    /// upstream only when `listing_complete` is true.
    pub fn classify(
        candidates: &CandidateSet,
        store: &dyn Store,
        listing_complete: bool,
    ) -> StorageResult<DiffReport> {
        let stored = store.stored_markers()?;
        Ok(Self::classify_against(candidates, &stored, listing_complete))
    }

    /// Classification against an already loaded identifier-to-marker map
    pub fn classify_against(
        candidates: &CandidateSet,
        stored: &BTreeMap<String, Option<String>>,
        listing_complete: bool,
    ) -> DiffReport {
        let entries = candidates
            .iter()
            .map(|candidate| {
                let kind = match stored.get(&candidate.id) {
                    None => ChangeKind::New,
                    Some(stored_marker) => match &candidate.marker {
                        Some(marker) if stored_marker.as_ref() != Some(marker) => {
                            ChangeKind::Updated
                        }
                        _ => ChangeKind::Unchanged,
                    },
                };
                (candidate.clone(), kind)
            })
            .collect();

        let removed_upstream = if listing_complete {
            stored
                .keys()
                .filter(|id| !candidates.contains(id))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        DiffReport {
            entries,
            removed_upstream,
            listing_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, marker: Option<&str>) -> Candidate {
        Candidate {
            id: id.to_string(),
            source_url: format!("https://example.com/{}/", id),
            title: id.to_string(),
            marker: marker.map(String::from),
        }
    }

    fn stored(entries: &[(&str, Option<&str>)]) -> BTreeMap<String, Option<String>> {
        entries
            .iter()
            .map(|(id, marker)| (id.to_string(), marker.map(String::from)))
            .collect()
    }

    #[test]
    fn test_classification() {
        let candidates: CandidateSet = vec![
            candidate("fresh", Some("v1")),
            candidate("bumped", Some("v2")),
            candidate("same", Some("v1")),
            candidate("no-marker", None),
            candidate("gained-marker", Some("Build 9")),
        ]
        .into_iter()
        .collect();

        let store = stored(&[
            ("bumped", Some("v1")),
            ("same", Some("v1")),
            ("no-marker", Some("v3")),
            ("gained-marker", None),
            ("gone", Some("v1")),
        ]);

        let report = DiffDetector::classify_against(&candidates, &store, true);

        let kinds: Vec<_> = report
            .entries
            .iter()
            .map(|(c, k)| (c.id.as_str(), *k))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("fresh", ChangeKind::New),
                ("bumped", ChangeKind::Updated),
                ("same", ChangeKind::Unchanged),
                ("no-marker", ChangeKind::Unchanged),
                ("gained-marker", ChangeKind::Updated),
            ]
        );
        assert_eq!(report.removed_upstream, vec!["gone".to_string()]);
        assert_eq!(report.count(ChangeKind::RemovedUpstream), 1);

        let to_fetch: Vec<_> = report.needs_fetch().map(|c| c.id.as_str()).collect();
        assert_eq!(to_fetch, vec!["fresh", "bumped", "gained-marker"]);
    }

    #[test]
    fn test_partial_listing_skips_removed() {
        let candidates: CandidateSet = vec![candidate("a", None)].into_iter().collect();
        let store = stored(&[("a", None), ("b", None)]);

        let report = DiffDetector::classify_against(&candidates, &store, false);
        assert!(report.removed_upstream.is_empty());
        assert!(!report.listing_complete);
    }

    #[test]
    fn test_classify_reads_store() {
        use crate::model::{DownloadLink, GameRecord};
        use crate::storage::SqliteStore;

        let store = SqliteStore::new_in_memory().unwrap();
        store
            .upsert(&GameRecord {
                id: "a".to_string(),
                title: "A".to_string(),
                page_url: "https://example.com/a/".to_string(),
                version: Some("v1".to_string()),
                size: None,
                description: String::new(),
                cover_image: None,
                screenshots: vec![],
                system_requirements: BTreeMap::new(),
                game_info: BTreeMap::new(),
                download_links: vec![DownloadLink {
                    host: "gofile.io".to_string(),
                    url: "https://gofile.io/d/a".to_string(),
                }],
            })
            .unwrap();

        let candidates: CandidateSet = vec![candidate("a", Some("v2")), candidate("b", None)]
            .into_iter()
            .collect();
        let report = DiffDetector::classify(&candidates, &store, true).unwrap();

        assert_eq!(report.count(ChangeKind::Updated), 1);
        assert_eq!(report.count(ChangeKind::New), 1);
        assert!(report.removed_upstream.is_empty());
    }
}
