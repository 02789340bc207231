use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use gamevault::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Produces the hoster label shown next to a download link
///
/// The label is the lowercase host without a leading `www.`. Unparseable links
/// get the label `"unknown"` so they are still stored and shown unmodified.
///
/// # Examples
///
/// ```
/// use gamevault::url::host_label;
///
/// assert_eq!(host_label("https://www.Pixeldrain.com/u/abc"), "pixeldrain.com");
/// assert_eq!(host_label("not a url"), "unknown");
/// ```
pub fn host_label(link: &str) -> String {
    Url::parse(link)
        .ok()
        .as_ref()
        .and_then(extract_domain)
        .map(|host| match host.strip_prefix("www.") {
            Some(stripped) => stripped.to_string(),
            None => host,
        })
        .unwrap_or_else(|| "unknown".to_string())
}
