//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Identifier of a bookmark row, assigned by the record store.
///
/// The value is opaque: the hosted table uses UUIDs, but nothing here relies
/// on that beyond generating v7 UUIDs in the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BookmarkId(String);

impl BookmarkId {
    /// Create a new unique bookmark ID using UUID v7
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BookmarkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Bookmark ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Identifier of an authenticated user, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("User ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bookmark_id_unique() {
        let id1 = BookmarkId::generate();
        let id2 = BookmarkId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_bookmark_id_parse_trims() {
        let id: BookmarkId = "  abc-123 ".parse().unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_ids_reject_empty() {
        assert!(" ".parse::<BookmarkId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id: BookmarkId = "b-1".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"b-1\"");

        let user: UserId = serde_json::from_str("\"user-1\"").unwrap();
        assert_eq!(user.as_str(), "user-1");
    }
}
