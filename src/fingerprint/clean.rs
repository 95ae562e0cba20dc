//! Markup cleaning and text hashing
//!
//! Cleaning removes markup that changes on every request (scripts, cache
//! busters, counters, clock times, ad markers) so that the exact hash only
//! moves when the page itself moves.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Number of most frequent tokens folded into the fuzzy hash
const FUZZY_TOP_TOKENS: usize = 50;

static BLOCK_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script[^>]*>.*?</script>",
        r"(?is)<style[^>]*>.*?</style>",
        r"(?s)<!--.*?-->",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hardcoded regex pattern is valid"))
    .collect()
});

/// Patterns for content that varies between otherwise identical responses
///
/// Counters come before the bare clock/date patterns so "1,204 views" is
/// removed as a whole.
static DYNAMIC_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Engagement counters
        r"[0-9,]+\s*(?:views?|likes?|shares?|comments?)\b",
        // Session, CSRF and cache-buster query parameters
        r"[?&](?:session|token|csrf|auth|key|id)=[a-zA-Z0-9_-]+",
        r"[?&]captcha=[a-zA-Z0-9_-]+",
        r"[?&]t=\d+",
        r"[?&]v=\d+",
        r"[?&]cache=\d+",
        r"[?&]timestamp=\d+",
        r"[?&]_=\d+",
        // Dynamic attributes
        r#"data-[a-zA-Z-]+="[^"]*""#,
        r#"id="[a-zA-Z0-9_-]*dynamic[a-zA-Z0-9_-]*""#,
        r#"class="[^"]*dynamic[^"]*""#,
        r#"nonce="[^"]*""#,
        // Labels running to the end of the line or the next tag
        r"Last updated:[^\n<]*",
        r"Updated:[^\n<]*",
        r"Modified:[^\n<]*",
        r"Published:[^\n<]*",
        r"Created:[^\n<]*",
        // Clock times and dates
        r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?",
        r"\b\d{1,2}/\d{1,2}/\d{4}\b",
        r"\b\d{4}-\d{2}-\d{2}\b",
        r"\b\d{1,2}:\d{2}:\d{2}\b",
        r"\b\d{1,2}:\d{2}\s*(?:AM|PM)\b",
        // Ad markers
        r"\bAdvertisement\b",
        r"\bSponsored\b",
        r"\bAd by\b",
        r"\bPromoted\b",
        // Tracking hosts
        r"google-analytics\.com",
        r"googletagmanager\.com",
        r"connect\.facebook\.net",
        r"facebook\.net",
        r"platform\.twitter\.com",
        r"twitter\.com/widgets",
    ]
    .iter()
    .map(|pattern| {
        Regex::new(&format!("(?i){}", pattern)).expect("hardcoded regex pattern is valid")
    })
    .collect()
});

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("hardcoded regex pattern is valid"));

static TAG_GAP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(<|>)\s*").expect("hardcoded regex pattern is valid"));

static TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+").expect("hardcoded regex pattern is valid"));

/// Strips volatile content and normalizes whitespace
///
/// Tags are kept: the result is still markup, just without the parts that
/// change between requests. Whitespace runs collapse to one space and
/// whitespace touching a tag boundary is dropped.
pub fn clean_content(markup: &str) -> String {
    let mut cleaned = markup.to_string();

    for regex in BLOCK_REGEXES.iter() {
        cleaned = regex.replace_all(&cleaned, "").into_owned();
    }

    for regex in DYNAMIC_REGEXES.iter() {
        cleaned = regex.replace_all(&cleaned, "").into_owned();
    }

    let collapsed = WHITESPACE_REGEX.replace_all(&cleaned, " ");
    TAG_GAP_REGEX
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}

/// Hex-encoded SHA-256 of arbitrary bytes
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Exact hash of already-cleaned content
pub fn content_hash(cleaned: &str) -> String {
    sha256_hex(cleaned.as_bytes())
}

/// Hash of the most frequent words, tolerant of small edits
///
/// Tokens are lowercase `\w+` runs longer than two characters. The 50 most
/// frequent are joined with spaces and hashed; ties keep first-seen order.
pub fn fuzzy_hash(cleaned: &str) -> String {
    let lowered = cleaned.to_lowercase();
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for token in TOKEN_REGEX.find_iter(&lowered).map(|m| m.as_str()) {
        if token.chars().count() <= 2 {
            continue;
        }
        match index.get(token) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(token, order.len());
                order.push((token, 1));
            }
        }
    }

    // Stable sort keeps encounter order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let fingerprint = order
        .iter()
        .take(FUZZY_TOP_TOKENS)
        .map(|(token, _)| *token)
        .collect::<Vec<_>>()
        .join(" ");

    sha256_hex(fingerprint.as_bytes())
}

/// Jaccard index of the lowercase word sets of two texts
///
/// Two texts without any words are considered identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let a_words: std::collections::HashSet<&str> =
        TOKEN_REGEX.find_iter(&a_lower).map(|m| m.as_str()).collect();
    let b_words: std::collections::HashSet<&str> =
        TOKEN_REGEX.find_iter(&b_lower).map(|m| m.as_str()).collect();

    let union = a_words.union(&b_words).count();
    if union == 0 {
        return 1.0;
    }
    let intersection = a_words.intersection(&b_words).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_scripts_styles_comments() {
        let html = "<p>Hi</p><script>var x = Date.now();</script><style>p{}</style><!-- build 42 -->";
        assert_eq!(clean_content(html), "<p>Hi</p>");
    }

    #[test]
    fn test_script_case_insensitive_and_multiline() {
        let html = "<SCRIPT type=\"text/javascript\">\nlet a = 1;\n</SCRIPT><p>x</p>";
        assert_eq!(clean_content(html), "<p>x</p>");
    }

    #[test]
    fn test_counter_insertion_keeps_hash() {
        let base = "<article><p>Hello world</p></article>";
        let with_counter = "<article><p>Hello world 1,204 views</p></article>";
        assert_eq!(
            content_hash(&clean_content(base)),
            content_hash(&clean_content(with_counter))
        );
    }

    #[test]
    fn test_cache_buster_insertion_keeps_hash() {
        let base = r#"<img src="/logo.png"><p>Body</p>"#;
        let busted = r#"<img src="/logo.png?v=1712345678"><p>Body</p>"#;
        assert_eq!(clean_content(base), clean_content(busted));
    }

    #[test]
    fn test_clock_time_insertion_keeps_hash() {
        let base = "<p>Server time:</p>";
        let timed = "<p>Server time: 12:04:55</p>";
        assert_eq!(clean_content(base), clean_content(timed));
    }

    #[test]
    fn test_label_stops_at_tag() {
        let html = "<span>Last updated: 5 minutes ago</span><p>Keep me</p>";
        assert_eq!(clean_content(html), "<span></span><p>Keep me</p>");
    }

    #[test]
    fn test_real_change_moves_hash() {
        let a = clean_content("<p>Price is 10 dollars</p>");
        let b = clean_content("<p>Price is 12 dollars</p>");
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fuzzy_ignores_short_tokens_and_case() {
        assert_eq!(fuzzy_hash("The cat is on a mat"), fuzzy_hash("the CAT IS on A MAT"));
        assert_eq!(fuzzy_hash("the cat mat"), fuzzy_hash("the cat mat is on a"));
    }

    #[test]
    fn test_fuzzy_depends_on_frequency_order() {
        assert_ne!(fuzzy_hash("apple apple banana"), fuzzy_hash("apple banana banana"));
        assert_eq!(fuzzy_hash("apple banana"), fuzzy_hash("apple banana"));
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("a b c", "a b c"), 1.0);
        assert_eq!(similarity("a b", "c d"), 0.0);
        assert!((similarity("one two three", "one two four") - 0.5).abs() < 1e-9);
        assert_eq!(similarity("Hello", "hello"), 1.0);
    }
}
