//! HTML parsers for listing pages and game pages
//!
//! This module handles parsing HTML content to extract:
//! - Game candidates from a listing page
//! - A complete [`GameRecord`] from a single game page
//!
//! Parsing is synchronous and never touches the network, so a parser can be
//! exercised directly on fixture HTML.

use crate::model::{Candidate, DownloadLink, GameRecord};
use crate::url::{
    canonical_page_url, clean_title, extract_marker, host_label, identifier_from_url,
    resolve_href,
};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Keywords one of which the game page heading must contain
const TITLE_KEYWORDS: [&str; 3] = ["download", "free", "direct"];

/// Why a fetched game page did not yield a usable record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid page URL: {0}")]
    InvalidUrl(String),

    #[error("expected element not found: {0}")]
    MissingElement(&'static str),

    #[error("no heading or leading paragraph names the game")]
    MissingTitle,

    #[error("page has no download links")]
    NoDownloadLinks,

    #[error("invalid selector {0}")]
    Selector(String),
}

/// Pure transform from page content to one record
pub trait RecordParser: Send + Sync {
    /// Parses the HTML fetched from `page_url`
    fn parse(&self, page_url: &str, html: &str) -> Result<GameRecord, ParseError>;
}

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector(format!("'{}': {:?}", css, e)))
}

/// Visible text of an element with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

// ===== Listing Pages =====

/// Extracts game candidates from a listing page
///
/// Anchors inside `.az-link-posts-block` are game links. Relative hrefs are
/// resolved against `base_url`; titles are cleaned of listing noise words and
/// carry the version marker if one is present. Anchors whose URL yields no
/// identifier are skipped. Duplicates are kept here and dropped by
/// [`crate::model::CandidateSet`].
///
/// # Example
///
/// ```
/// use gamevault::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<div class="az-link-posts-block">
///     <a href="/hades-free-download/">Hades Free Download (v1.38)</a>
/// </div>"#;
/// let base = Url::parse("https://example.com").unwrap();
/// let candidates = parse_listing(html, &base);
/// assert_eq!(candidates[0].id, "hades-free-download");
/// assert_eq!(candidates[0].marker.as_deref(), Some("v1.38"));
/// ```
pub fn parse_listing(html: &str, base_url: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let Ok(anchor_selector) = selector(".az-link-posts-block a[href]") else {
        return Vec::new();
    };

    let mut candidates = Vec::new();
    for anchor in document.select(&anchor_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(source_url) = resolve_href(href, base_url) else {
            continue;
        };

        let id = match identifier_from_url(&source_url) {
            Ok(id) => id,
            Err(e) => {
                debug!(href, error = %e, "Skipping listing link");
                continue;
            }
        };

        let title = clean_title(&element_text(anchor));
        let marker = extract_marker(&title);

        candidates.push(Candidate {
            id,
            source_url,
            title,
            marker,
        });
    }

    candidates
}

// ===== Game Pages =====

/// [`RecordParser`] for the listing site's game page markup
///
/// Expected layout: an `article#the-post` holding a `div.entry-content` with
/// the title heading, description paragraphs, a SCREENSHOTS section, a
/// `.checklist` of system requirements, a `.plus` list of game facts, and
/// download anchors. The cover image sits in `figure.single-featured-image`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GamePageParser;

impl GamePageParser {
    pub fn new() -> Self {
        Self
    }
}

impl RecordParser for GamePageParser {
    fn parse(&self, page_url: &str, html: &str) -> Result<GameRecord, ParseError> {
        let canonical =
            canonical_page_url(page_url).map_err(|e| ParseError::InvalidUrl(e.to_string()))?;
        let id =
            identifier_from_url(page_url).map_err(|e| ParseError::InvalidUrl(e.to_string()))?;

        let document = Html::parse_document(html);

        let cover_image = extract_cover_image(&document, &canonical)?;

        let post = document
            .select(&selector("article#the-post")?)
            .next()
            .ok_or(ParseError::MissingElement("article#the-post"))?;
        let content = post
            .select(&selector("div.entry-content")?)
            .next()
            .ok_or(ParseError::MissingElement("div.entry-content"))?;

        let title = extract_title(content)?;
        let description = extract_description(content);
        let screenshots = extract_screenshots(content, &canonical)?;
        let system_requirements = extract_key_values(content, "div.checklist li")?;
        let game_info = extract_key_values(content, "div.plus li")?;
        let download_links = extract_download_links(content, &canonical)?;

        if download_links.is_empty() {
            return Err(ParseError::NoDownloadLinks);
        }

        let version = extract_marker(&title).or_else(|| lookup_fact(&game_info, "version"));
        let size = lookup_fact(&game_info, "size");

        Ok(GameRecord {
            id,
            title,
            page_url: canonical.to_string(),
            version,
            size,
            description,
            cover_image,
            screenshots,
            system_requirements,
            game_info,
            download_links,
        })
    }
}

/// First heading (h2, then h1, then h3) or one of the first five paragraphs
/// that mentions a title keyword
fn extract_title(content: ElementRef<'_>) -> Result<String, ParseError> {
    let mentions_keyword = |text: &str| {
        let lower = text.to_lowercase();
        TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
    };

    let mut found = None;
    for tag in ["h2", "h1", "h3"] {
        found = content
            .select(&selector(tag)?)
            .map(element_text)
            .find(|text| mentions_keyword(text.as_str()));
        if found.is_some() {
            break;
        }
    }

    if found.is_none() {
        found = content
            .select(&selector("p")?)
            .take(5)
            .map(element_text)
            .find(|text| mentions_keyword(text.as_str()));
    }

    let title = found.ok_or(ParseError::MissingTitle)?;
    Ok(title
        .replace("Direct Download", "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}

/// Direct child paragraphs before the first h4, one per line
fn extract_description(content: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for child in content.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "h4" => break,
            "p" => {
                let text = element_text(child);
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            _ => {}
        }
    }
    parts.join("\n")
}

/// Links in the siblings following the SCREENSHOTS heading, up to the next h4
fn extract_screenshots(content: ElementRef<'_>, base: &Url) -> Result<Vec<String>, ParseError> {
    let anchors = selector("a[href]")?;
    let Some(heading) = content
        .select(&selector("h4")?)
        .find(|h| element_text(*h).to_uppercase().contains("SCREENSHOTS"))
    else {
        return Ok(Vec::new());
    };

    let mut screenshots = Vec::new();
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        if sibling.value().name() == "h4" {
            break;
        }
        screenshots.extend(
            sibling
                .select(&anchors)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| resolve_href(href, base)),
        );
    }
    Ok(screenshots)
}

/// `<li><strong>Key:</strong> value</li>` pairs under the given list selector
fn extract_key_values(
    content: ElementRef<'_>,
    items_css: &str,
) -> Result<BTreeMap<String, String>, ParseError> {
    let strong = selector("strong")?;
    let mut pairs = BTreeMap::new();

    for item in content.select(&selector(items_css)?) {
        let Some(label) = item.select(&strong).next() else {
            continue;
        };
        let label_text = element_text(label);
        let key = label_text.trim_end_matches(':').trim().to_string();
        if key.is_empty() {
            continue;
        }

        let value = element_text(item)
            .replacen(&label_text, "", 1)
            .trim_matches(|c: char| c == ':' || c.is_whitespace())
            .to_string();
        pairs.insert(key, value);
    }

    Ok(pairs)
}

/// Anchors whose text mentions "download", minus links back to the page itself
fn extract_download_links(
    content: ElementRef<'_>,
    page: &Url,
) -> Result<Vec<DownloadLink>, ParseError> {
    let mut links = Vec::new();

    for anchor in content.select(&selector("a[href]")?) {
        if !element_text(anchor).to_lowercase().contains("download") {
            continue;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };

        let href = href.trim();
        let url = if href.starts_with("//") {
            format!("https:{}", href)
        } else {
            match resolve_href(href, page) {
                Some(url) => url,
                None => continue,
            }
        };

        let points_at_page = canonical_page_url(&url)
            .map(|u| u == *page)
            .unwrap_or(false);
        if points_at_page {
            continue;
        }

        links.push(DownloadLink {
            host: host_label(&url),
            url,
        });
    }

    Ok(links)
}

/// Cover image URL, looking past lazy-load placeholders
fn extract_cover_image(document: &Html, base: &Url) -> Result<Option<String>, ParseError> {
    let Some(img) = document
        .select(&selector("figure.single-featured-image img")?)
        .next()
    else {
        return Ok(None);
    };

    let attrs = img.value();
    let is_placeholder = |s: &str| s.trim().is_empty() || s.starts_with("data:image/");

    let src = attrs.attr("src").unwrap_or("");
    if !is_placeholder(src) {
        return Ok(base.join(src).ok().map(|u| u.to_string()));
    }

    for attr in ["data-src", "data-lazy-src", "data-main-img"] {
        if let Some(alt) = attrs.attr(attr).filter(|s| !is_placeholder(s)) {
            return Ok(base.join(alt).ok().map(|u| u.to_string()));
        }
    }

    let first_srcset = attrs
        .attr("srcset")
        .and_then(|srcset| srcset.split(',').next())
        .and_then(|entry| entry.split_whitespace().next())
        .filter(|s| !is_placeholder(s));

    Ok(first_srcset.and_then(|u| base.join(u).ok()).map(|u| u.to_string()))
}

/// Value of the first game fact whose key mentions `needle`
fn lookup_fact(facts: &BTreeMap<String, String>, needle: &str) -> Option<String> {
    facts
        .iter()
        .find(|(key, value)| key.to_lowercase().contains(needle) && !value.is_empty())
        .map(|(_, value)| value.clone())
}
