use crate::url::slug::slugify;
use crate::{UrlError, UrlResult};
use url::Url;

/// Canonicalizes a game page URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Lowercase the host (done by the parser)
/// 4. Remove fragment and query string
///
/// The path is kept as published, including its trailing slash, because it is
/// fetched again on later runs.
///
/// # Examples
///
/// ```
/// use gamevault::url::canonical_page_url;
///
/// let url = canonical_page_url("https://EXAMPLE.com/zoochosis-free-download/?ref=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/zoochosis-free-download/");
/// ```
pub fn canonical_page_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    url.set_fragment(None);
    url.set_query(None);

    Ok(url)
}

/// Derives the stable game identifier from a page URL
///
/// The identifier is the slugified last non-empty path segment. It does not
/// depend on the listing title, so a version bump in the title keeps the same
/// identifier.
///
/// # Examples
///
/// ```
/// use gamevault::url::identifier_from_url;
///
/// let id = identifier_from_url("https://example.com/Zoochosis-Free-Download/").unwrap();
/// assert_eq!(id, "zoochosis-free-download");
/// ```
pub fn identifier_from_url(url_str: &str) -> UrlResult<String> {
    let url = canonical_page_url(url_str)?;

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| UrlError::MissingSlug(url.to_string()))?;

    Ok(slugify(segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_strips_query_and_fragment() {
        let url = canonical_page_url("https://example.com/game/?utm_source=x#comments").unwrap();
        assert_eq!(url.as_str(), "https://example.com/game/");
    }

    #[test]
    fn test_canonical_rejects_scheme() {
        assert!(matches!(
            canonical_page_url("ftp://example.com/game/"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_canonical_rejects_garbage() {
        assert!(matches!(
            canonical_page_url("not a url"),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_identifier_with_and_without_trailing_slash() {
        let a = identifier_from_url("https://example.com/hades-ii-free-download/").unwrap();
        let b = identifier_from_url("https://example.com/hades-ii-free-download").unwrap();
        assert_eq!(a, "hades-ii-free-download");
        assert_eq!(a, b);
    }

    #[test]
    fn test_identifier_nested_path() {
        let id = identifier_from_url("https://example.com/games/2024/Some_Game/").unwrap();
        assert_eq!(id, "some-game");
    }

    #[test]
    fn test_identifier_missing_slug() {
        assert!(matches!(
            identifier_from_url("https://example.com/"),
            Err(UrlError::MissingSlug(_))
        ));
    }
}
