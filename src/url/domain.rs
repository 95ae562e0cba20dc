use url::Url;

/// Extracts the lowercase host from a URL
///
/// The port is not part of the result, so `https://example.com:8443/` and
/// `https://example.com/` share a domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_freshness::url::extract_domain;
///
/// let url = Url::parse("https://News.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("news.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Removes a leading `www.` label from a host
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true if both URLs point at the same host and port
///
/// Feed candidates are only followed when they live on the page's own host.
pub fn same_host(a: &Url, b: &Url) -> bool {
    extract_domain(a) == extract_domain(b) && a.port_or_known_default() == b.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_strip_www() {
        assert_eq!(strip_www("www.example.com"), "example.com");
        assert_eq!(strip_www("example.com"), "example.com");
        assert_eq!(strip_www("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_same_host() {
        let page = Url::parse("https://example.com/article").unwrap();
        let feed = Url::parse("https://EXAMPLE.com/feed.xml").unwrap();
        let other = Url::parse("https://feeds.example.com/rss").unwrap();
        assert!(same_host(&page, &feed));
        assert!(!same_host(&page, &other));
    }

    #[test]
    fn test_same_host_respects_port() {
        let a = Url::parse("http://127.0.0.1:4000/").unwrap();
        let b = Url::parse("http://127.0.0.1:5000/feed").unwrap();
        assert!(!same_host(&a, &b));
    }
}
