use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Bookmark id meaning "not bookmarked".
pub const NO_BOOKMARK: i64 = -1;

/// Separator of the stored tag string.
pub const TAG_DELIMITER: char = ',';

/// Immutable content snapshot of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: i64,
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated: DateTime<Utc>,
}

/// Metadata record of a feed item, independent of its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub feed_id: i64,
    /// `None` until the entry has been classified as read or unread.
    pub read: Option<bool>,
    pub marked_unread_on_update: bool,
    pub starred: bool,
    pub tags: BTreeSet<String>,
    pub deleted: bool,
    pub provided_id: Option<String>,
    pub entry_url: Option<String>,
    pub primary_hash: Option<String>,
    pub secondary_hash: Option<String>,
    pub date: DateTime<Utc>,
    pub bookmarked: bool,
    /// Bookmark the entry belongs to; `None` when not bookmarked.
    pub bookmark_id: Option<i64>,
    /// Revision ids, oldest first. Never empty for a stored entry.
    pub revisions: Vec<i64>,
}

impl Entry {
    pub fn latest_revision(&self) -> Option<i64> {
        self.revisions.last().copied()
    }
}

/// A logical entry as handed over by the fetcher, before it is split into
/// an [`Entry`] and a [`Revision`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInput {
    /// Reuse an existing entry id to overwrite it.
    pub id: Option<i64>,
    pub revision_id: Option<i64>,
    pub feed_id: i64,
    pub read: Option<bool>,
    pub marked_unread_on_update: bool,
    pub starred: bool,
    /// Delimited tag string, see [`TAG_DELIMITER`].
    pub tags: String,
    pub deleted: bool,
    pub provided_id: Option<String>,
    pub entry_url: Option<String>,
    pub primary_hash: Option<String>,
    pub secondary_hash: Option<String>,
    pub date: DateTime<Utc>,
    pub bookmark_id: i64,
    pub authors: Vec<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub updated: DateTime<Utc>,
}

impl EntryInput {
    pub fn new(feed_id: i64, provided_id: &str, entry_url: &str, date: DateTime<Utc>) -> Self {
        let feed = feed_id.to_string();
        Self {
            id: None,
            revision_id: None,
            feed_id,
            read: Some(false),
            marked_unread_on_update: false,
            starred: false,
            tags: String::new(),
            deleted: false,
            provided_id: Some(provided_id.to_string()),
            entry_url: Some(entry_url.to_string()),
            primary_hash: Some(Self::generate_hash(&[&feed, provided_id])),
            secondary_hash: Some(Self::generate_hash(&[&feed, entry_url])),
            date,
            bookmark_id: NO_BOOKMARK,
            authors: Vec::new(),
            title: None,
            content: None,
            updated: date,
        }
    }

    /// Deterministic hex SHA-256 over the given parts.
    pub fn generate_hash(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }

    pub fn is_bookmarked(&self) -> bool {
        self.bookmark_id != NO_BOOKMARK
    }

    /// The bookmark id as stored, with the sentinel mapped to `None`.
    pub fn stored_bookmark_id(&self) -> Option<i64> {
        Some(self.bookmark_id).filter(|_| self.is_bookmarked())
    }

    pub fn normalized_tags(&self) -> BTreeSet<String> {
        parse_tags(&self.tags)
    }
}

/// Splits a delimited tag string into its indexable set.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_tags(tags: &BTreeSet<String>) -> String {
    let mut joined = String::new();
    for tag in tags {
        if !joined.is_empty() {
            joined.push(TAG_DELIMITER);
        }
        joined.push_str(tag);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap()
    }

    #[test]
    fn test_hash_generation_deterministic() {
        let a = EntryInput::new(1, "guid-1", "https://example.com/a", at(100));
        let b = EntryInput::new(1, "guid-1", "https://example.com/a", at(999));
        assert_eq!(a.primary_hash, b.primary_hash);
        assert_eq!(a.secondary_hash, b.secondary_hash);
    }

    #[test]
    fn test_hash_depends_on_feed() {
        let a = EntryInput::new(1, "guid-1", "https://example.com/a", at(100));
        let b = EntryInput::new(2, "guid-1", "https://example.com/a", at(100));
        assert_ne!(a.primary_hash, b.primary_hash);
    }

    #[test]
    fn test_hash_parts_are_separated() {
        assert_ne!(
            EntryInput::generate_hash(&["ab", "c"]),
            EntryInput::generate_hash(&["a", "bc"])
        );
        let hash = EntryInput::generate_hash(&["x"]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_bookmark_sentinel() {
        let mut input = EntryInput::new(1, "guid-1", "https://example.com/a", at(100));
        assert!(!input.is_bookmarked());
        assert_eq!(input.stored_bookmark_id(), None);
        input.bookmark_id = 0;
        assert!(input.is_bookmarked());
        assert_eq!(input.stored_bookmark_id(), Some(0));
    }

    #[test]
    fn test_parse_tags_trims_and_dedups() {
        let tags = parse_tags(" rust, news,,rust ,  ");
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("rust"));
        assert!(tags.contains("news"));
        assert_eq!(join_tags(&tags), "news,rust");
    }

    #[test]
    fn test_parse_tags_empty() {
        assert!(parse_tags("").is_empty());
        assert_eq!(join_tags(&BTreeSet::new()), "");
    }
}
