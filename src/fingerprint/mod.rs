//! Content fingerprinting
//!
//! Three hashes are computed for every HTML page:
//!
//! - `content_hash`: SHA-256 of the cleaned markup (exact match)
//! - `fuzzy_hash`: SHA-256 of the 50 most frequent words (near match)
//! - `structured_hash`: SHA-256 of the structured extraction (semantic match)

mod clean;
mod structured;

pub use clean::{clean_content, content_hash, fuzzy_hash, sha256_hex, similarity};
pub use structured::{canonical_url, extract_structured, is_listing_page, structured_hash};

use crate::snapshot::StructuredContent;

/// All fingerprint signals for one page
#[derive(Debug, Clone, PartialEq)]
pub struct Fingerprint {
    pub content_hash: String,
    pub fuzzy_hash: String,
    pub structured_hash: String,
    pub structured_content: StructuredContent,
    /// Length in bytes of the cleaned markup
    pub cleaned_length: usize,
}

impl Fingerprint {
    /// Computes every fingerprint signal for raw markup
    pub fn of(markup: &str) -> Self {
        let cleaned = clean_content(markup);
        let structured_content = extract_structured(markup);

        Self {
            content_hash: content_hash(&cleaned),
            fuzzy_hash: fuzzy_hash(&cleaned),
            structured_hash: structured_hash(&structured_content),
            structured_content,
            cleaned_length: cleaned.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_stable_across_dynamic_noise() {
        let a = Fingerprint::of("<html><body><h1>Docs</h1><p>Install the tool.</p></body></html>");
        let b = Fingerprint::of(
            "<html><body><h1>Docs</h1><p>Install the tool.</p><script>var t=1;</script></body></html>",
        );
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.fuzzy_hash, b.fuzzy_hash);
        assert_eq!(a.structured_hash, b.structured_hash);
    }

    #[test]
    fn test_fingerprint_moves_on_edit() {
        let a = Fingerprint::of("<h1>Docs</h1><p>Install the tool.</p>");
        let b = Fingerprint::of("<h1>Docs</h1><p>Uninstall the tool.</p>");
        assert_ne!(a.content_hash, b.content_hash);
        assert_ne!(a.structured_hash, b.structured_hash);
        assert_eq!(a.structured_content.canonical_content, "Docs Install the tool.");
    }

    #[test]
    fn test_cleaned_length() {
        let fp = Fingerprint::of("<p>  abc  </p>");
        assert_eq!(fp.cleaned_length, "<p>abc</p>".len());
    }
}
