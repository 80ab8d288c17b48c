//! Title search for marks
//!
//! Matching is a case-insensitive substring test on the bookmark title. It
//! runs over the in-memory collection, so no index is involved.

use crate::models::Bookmark;

/// A prepared title query.
///
/// An empty query matches everything. Whitespace is significant, the same
/// as any other character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleQuery {
    needle: Option<String>,
}

impl TitleQuery {
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self {
            needle: (!raw.is_empty()).then(|| raw.to_lowercase()),
        }
    }

    /// Whether the query filters anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.needle.is_none()
    }

    #[must_use]
    pub fn matches(&self, bookmark: &Bookmark) -> bool {
        self.needle
            .as_deref()
            .map_or(true, |needle| bookmark.title.to_lowercase().contains(needle))
    }
}
