use url::Url;

/// Resolves an href against a base URL, ignoring unusable links
pub fn resolve_against(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("data:") {
        return None;
    }
    base.join(href).ok()
}

/// Compares two URL strings loosely
///
/// Two URLs are considered equal when they match exactly, when they only
/// differ by a trailing slash, or when they only differ by a `www.` prefix.
///
/// # Examples
///
/// ```
/// use sumi_freshness::url::loosely_equal;
///
/// assert!(loosely_equal("https://example.com/a/", "https://example.com/a"));
/// assert!(loosely_equal("https://www.example.com/a", "https://example.com/a"));
/// assert!(!loosely_equal("https://example.com/a", "https://example.com/b"));
/// ```
pub fn loosely_equal(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    if a.trim_end_matches('/') == b.trim_end_matches('/') {
        return true;
    }
    let a = a.replacen("www.", "", 1);
    let b = b.replacen("www.", "", 1);
    a.trim_end_matches('/') == b.trim_end_matches('/')
}
