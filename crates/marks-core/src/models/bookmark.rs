//! Bookmark model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookmarkId, UserId};
use crate::error::{Error, Result};

/// A bookmark row as stored by the record store.
///
/// Field names follow the hosted table's columns so rows deserialize directly
/// from REST responses and change-feed payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Unique identifier, assigned by the record store
    pub id: BookmarkId,
    /// Display title
    pub title: String,
    /// Target locator
    pub url: String,
    /// Owning user, fixed at creation
    pub user_id: UserId,
    /// Creation timestamp, used for display ordering only
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    /// Whether this bookmark belongs to `user_id`.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }
}

/// User input for a new bookmark, validated before any backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkDraft {
    title: String,
    url: String,
}

impl BookmarkDraft {
    /// Build a draft from raw input, trimming both fields.
    pub fn new(title: &str, url: &str) -> Result<Self> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() || url.is_empty() {
            return Err(Error::InvalidInput("Title and URL are required".into()));
        }
        Ok(Self {
            title: title.to_string(),
            url: url.to_string(),
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Turn the draft into a stored row with the given identity.
    #[must_use]
    pub fn into_bookmark(
        self,
        id: BookmarkId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Bookmark {
        Bookmark {
            id,
            title: self.title,
            url: self.url,
            user_id,
            created_at,
        }
    }
}
