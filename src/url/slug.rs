/// Words the listing site sprinkles into titles
const NOISE_WORDS: &[&str] = &["direct", "download", "free", "link", "game"];

/// Converts text into a lowercase, dash-separated slug
///
/// Runs of anything other than ASCII letters and digits collapse into a single
/// dash; leading and trailing dashes are dropped. Empty input yields `"game"`.
///
/// # Examples
///
/// ```
/// use gamevault::url::slugify;
///
/// assert_eq!(slugify("Hades II (v1.0)"), "hades-ii-v1-0");
/// assert_eq!(slugify("!!!"), "game");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "game".to_string()
    } else {
        slug
    }
}

/// Removes listing noise words and collapses whitespace
///
/// # Examples
///
/// ```
/// use gamevault::url::clean_title;
///
/// assert_eq!(clean_title("Zoochosis  Free Download"), "Zoochosis");
/// assert_eq!(clean_title("Hades II Direct Link (v1.0)"), "Hades II (v1.0)");
/// ```
pub fn clean_title(title: &str) -> String {
    title
        .split_whitespace()
        .filter(|word| !NOISE_WORDS.contains(&word.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts the update marker from a trailing parenthesised group
///
/// Recognizes `(v1.2.3)`, `(V 1.2)` and `(Build 12345)` style suffixes. Anything
/// else in trailing parentheses (a year, an edition name) is not a marker.
///
/// # Examples
///
/// ```
/// use gamevault::url::extract_marker;
///
/// assert_eq!(extract_marker("Zoochosis (v1.0.3)"), Some("v1.0.3".to_string()));
/// assert_eq!(extract_marker("Game (Build 15170332)"), Some("Build 15170332".to_string()));
/// assert_eq!(extract_marker("Game (2024)"), None);
/// ```
pub fn extract_marker(title: &str) -> Option<String> {
    let trimmed = title.trim_end();
    let inner = trimmed.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let marker = inner[open + 1..].trim();

    let lower = marker.to_lowercase();
    let is_version = lower
        .strip_prefix('v')
        .map(|rest| rest.trim_start().starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(false);
    let is_build = lower.starts_with("build");

    if is_version || is_build {
        Some(marker.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Zoochosis Free Download"), "zoochosis-free-download");
        assert_eq!(slugify("  --Leading and trailing--  "), "leading-and-trailing");
        assert_eq!(slugify("a__b"), "a-b");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Pokémon"), "pok-mon");
        assert_eq!(slugify(""), "game");
    }

    #[test]
    fn test_clean_title_case_insensitive() {
        assert_eq!(clean_title("DOWNLOAD Celeste free"), "Celeste");
        assert_eq!(clean_title("   "), "");
    }

    #[test]
    fn test_clean_title_keeps_partial_words() {
        assert_eq!(clean_title("Freedom Planet"), "Freedom Planet");
        assert_eq!(clean_title("Gamedec"), "Gamedec");
    }

    #[test]
    fn test_extract_marker_variants() {
        assert_eq!(extract_marker("X (v1.2)"), Some("v1.2".to_string()));
        assert_eq!(extract_marker("X (V 2.0.1) "), Some("V 2.0.1".to_string()));
        assert_eq!(extract_marker("X (build 77)"), Some("build 77".to_string()));
    }

    #[test]
    fn test_extract_marker_rejects() {
        assert_eq!(extract_marker("No marker"), None);
        assert_eq!(extract_marker("X (Deluxe Edition)"), None);
        assert_eq!(extract_marker("X (vr)"), None);
        assert_eq!(extract_marker("X (v1.0) extra"), None);
    }
}
