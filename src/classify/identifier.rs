//! Compact change identifiers
//!
//! An identifier is `key:value` pairs joined by `|`, built from a snapshot's
//! validators and hashes. It is cheap to store and compare.

use crate::snapshot::Snapshot;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const LAST_MODIFIED_KEY: &str = "last_modified_header";
pub const ETAG_KEY: &str = "etag_header";
pub const CONTENT_HASH_KEY: &str = "content_hash";
pub const STRUCTURED_HASH_KEY: &str = "structured_hash";
pub const FUZZY_HASH_KEY: &str = "fuzzy_hash";

/// Older identifiers used this key for the `Last-Modified` header
const LEGACY_LAST_MODIFIED_KEY: &str = "last_modified";

const HEADER_KEYS: &[&str] = &[LAST_MODIFIED_KEY, ETAG_KEY];

/// Ordered `key:value` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifier {
    parts: Vec<(String, String)>,
}

impl Identifier {
    /// Builds an identifier from whichever signals the snapshot carries
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut identifier = Self::default();
        let fields = [
            (LAST_MODIFIED_KEY, &snapshot.last_modified_header),
            (ETAG_KEY, &snapshot.etag_header),
            (CONTENT_HASH_KEY, &snapshot.content_hash),
            (STRUCTURED_HASH_KEY, &snapshot.structured_hash),
            (FUZZY_HASH_KEY, &snapshot.fuzzy_hash),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                identifier.set(key, value);
            }
        }
        identifier
    }

    /// Parses an identifier string; segments without a `:` are ignored
    pub fn parse(s: &str) -> Self {
        let mut identifier = Self::default();
        for segment in s.split('|') {
            if let Some((key, value)) = segment.split_once(':') {
                identifier.set(key, value);
            }
        }
        identifier
    }

    /// Sets a key, replacing an existing value in place
    pub fn set(&mut self, key: &str, value: &str) {
        match self.parts.iter_mut().find(|(k, _)| k == key) {
            Some(part) => part.1 = value.to_string(),
            None => self.parts.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{}:{}", key, value)?;
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Compares two identifier strings
///
/// Header validators are checked first (only those present in the old
/// identifier), then the structured hash, then the exact content hash.
pub fn has_content_changed(old_identifier: &str, new_identifier: &str) -> bool {
    if old_identifier.trim().is_empty() {
        return true;
    }

    let old = Identifier::parse(old_identifier);
    let new = Identifier::parse(new_identifier);

    for key in HEADER_KEYS {
        if old.contains(key) && old.get(key) != new.get(key) {
            return true;
        }
    }

    if old.get(STRUCTURED_HASH_KEY) != new.get(STRUCTURED_HASH_KEY) {
        return true;
    }

    // Reached when the structured hashes agree but the exact markup moved
    if old.get(CONTENT_HASH_KEY) != new.get(CONTENT_HASH_KEY) {
        return true;
    }

    false
}

/// Reads the `Last-Modified` value back out of an identifier string
pub fn last_modified_from_identifier(identifier: &str) -> Option<String> {
    let parsed = Identifier::parse(identifier);
    parsed
        .get(LAST_MODIFIED_KEY)
        .or_else(|| parsed.get(LEGACY_LAST_MODIFIED_KEY))
        .map(str::to_string)
}
