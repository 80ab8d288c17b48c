//! Reconciliation of local mutations with the live change feed
//!
//! [`BookmarkStore`] owns the signed-in user's bookmarks for one session. It
//! accepts optimistic local adds/deletes and remote change events in whatever
//! order they arrive and keeps a single collection that is:
//!
//! - unique by [`BookmarkId`],
//! - restricted to rows owned by the current user,
//! - ordered newest first (snapshot order, then prepend on arrival).
//!
//! The store performs no I/O and every operation is total. Callers serialize
//! access; the store itself holds no lock.

use tokio::sync::watch;

use crate::models::{Bookmark, BookmarkId, UserId};
use crate::search::TitleQuery;

/// A change notification from the change feed.
///
/// Deletes only carry the row identifier: the feed does not ship the old row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteChange {
    Insert(Bookmark),
    Update(Bookmark),
    Delete(BookmarkId),
}

impl RemoteChange {
    /// Identifier of the row this change is about.
    #[must_use]
    pub const fn id(&self) -> &BookmarkId {
        match self {
            Self::Insert(bookmark) | Self::Update(bookmark) => &bookmark.id,
            Self::Delete(id) => id,
        }
    }

    /// Lowercase event name, for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// A bookmark removed by [`BookmarkStore::apply_local_delete`], with the
/// position it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedBookmark {
    pub bookmark: Bookmark,
    pub position: usize,
}

/// The in-memory bookmark collection for one signed-in user.
#[derive(Debug)]
pub struct BookmarkStore {
    current_user_id: UserId,
    bookmarks: Vec<Bookmark>,
    revision: watch::Sender<u64>,
}

impl BookmarkStore {
    /// Build the store from the user's snapshot, keeping its order.
    ///
    /// Foreign rows and repeated ids in the snapshot are dropped.
    pub fn new(current_user_id: UserId, snapshot: impl IntoIterator<Item = Bookmark>) -> Self {
        let mut bookmarks: Vec<Bookmark> = Vec::new();
        for bookmark in snapshot {
            if !bookmark.is_owned_by(&current_user_id) {
                tracing::debug!("Dropping foreign bookmark {} from snapshot", bookmark.id);
                continue;
            }
            if bookmarks.iter().any(|existing| existing.id == bookmark.id) {
                continue;
            }
            bookmarks.push(bookmark);
        }

        let (revision, _) = watch::channel(0);
        Self {
            current_user_id,
            bookmarks,
            revision,
        }
    }

    /// Record a bookmark the record store just confirmed.
    ///
    /// Returns `false` when the id is already present (the feed echo won the
    /// race) or the row belongs to someone else.
    pub fn apply_local_add(&mut self, bookmark: Bookmark) -> bool {
        if !bookmark.is_owned_by(&self.current_user_id) {
            tracing::debug!("Ignoring local add of foreign bookmark {}", bookmark.id);
            return false;
        }
        self.prepend_if_absent(bookmark)
    }

    /// Optimistically remove a bookmark before the backend delete completes.
    ///
    /// The removal stands even if the backend delete later fails; use
    /// [`Self::restore_removed`] to put the row back.
    pub fn apply_local_delete(&mut self, id: &BookmarkId) -> Option<RemovedBookmark> {
        let position = self.position(id)?;
        let bookmark = self.bookmarks.remove(position);
        self.bump();
        Some(RemovedBookmark { bookmark, position })
    }

    /// Apply one change feed event.
    ///
    /// Returns whether the collection changed. Replaying an event is a no-op.
    pub fn apply_remote_change(&mut self, change: RemoteChange) -> bool {
        match change {
            RemoteChange::Insert(bookmark) => {
                if !bookmark.is_owned_by(&self.current_user_id) {
                    return false;
                }
                self.prepend_if_absent(bookmark)
            }
            RemoteChange::Update(bookmark) => {
                if !bookmark.is_owned_by(&self.current_user_id) {
                    return false;
                }
                let Some(position) = self.position(&bookmark.id) else {
                    tracing::debug!("Ignoring update for unknown bookmark {}", bookmark.id);
                    return false;
                };
                if self.bookmarks[position] == bookmark {
                    return false;
                }
                self.bookmarks[position] = bookmark;
                self.bump();
                true
            }
            RemoteChange::Delete(id) => self.remove(&id),
        }
    }

    /// Put back a bookmark whose backend delete failed.
    ///
    /// The row returns to its former position, clamped to the current length.
    /// Nothing happens if the id reappeared in the meantime.
    pub fn restore_removed(&mut self, removed: RemovedBookmark) -> bool {
        if self.contains(&removed.bookmark.id) {
            return false;
        }
        let position = removed.position.min(self.bookmarks.len());
        self.bookmarks.insert(position, removed.bookmark);
        self.bump();
        true
    }

    /// Bookmarks whose title contains `query`, ignoring case, in collection
    /// order. An empty query returns every bookmark.
    #[must_use]
    pub fn visible_view(&self, query: &str) -> Vec<&Bookmark> {
        let query = TitleQuery::new(query);
        self.bookmarks
            .iter()
            .filter(|bookmark| query.matches(bookmark))
            .collect()
    }

    /// Owned copy of the whole collection.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Bookmark> {
        self.bookmarks.clone()
    }

    #[must_use]
    pub fn get(&self, id: &BookmarkId) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|bookmark| &bookmark.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &BookmarkId) -> bool {
        self.position(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    #[must_use]
    pub const fn current_user_id(&self) -> &UserId {
        &self.current_user_id
    }

    /// Observe the collection. The value is a revision counter that increases
    /// on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn prepend_if_absent(&mut self, bookmark: Bookmark) -> bool {
        if self.contains(&bookmark.id) {
            return false;
        }
        self.bookmarks.insert(0, bookmark);
        self.bump();
        true
    }

    fn remove(&mut self, id: &BookmarkId) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        self.bookmarks.remove(position);
        self.bump();
        true
    }

    fn position(&self, id: &BookmarkId) -> Option<usize> {
        self.bookmarks.iter().position(|bookmark| &bookmark.id == id)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
