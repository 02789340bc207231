//! URL handling module for Gamevault
//!
//! This module derives stable game identifiers from page URLs, labels download
//! hosts, cleans listing titles and resolves hrefs found in scraped pages.

mod domain;
mod normalize;
mod slug;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, host_label};
pub use normalize::{canonical_page_url, identifier_from_url};
pub use slug::{clean_title, extract_marker, slugify};

/// Resolves an href found in a page to an absolute HTTP(S) URL
///
/// Protocol-relative hrefs (`//host/path`) resolve against the base scheme.
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// # Examples
///
/// ```
/// use gamevault::url::resolve_href;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/games/").unwrap();
/// assert_eq!(
///     resolve_href("/zoochosis-free-download/", &base),
///     Some("https://example.com/zoochosis-free-download/".to_string())
/// );
/// assert_eq!(resolve_href("mailto:a@b.c", &base), None);
/// ```
pub fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
