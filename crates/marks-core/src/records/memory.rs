//! In-memory record store for tests and offline use.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::RecordStore;
use crate::error::{Error, Result};
use crate::feed::BroadcastChangeFeed;
use crate::models::{Bookmark, BookmarkDraft, BookmarkId, UserId};
use crate::reconcile::RemoteChange;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Bookmark>,
    fail_next_insert: bool,
    fail_next_delete: bool,
}

/// Record store backed by a vector.
///
/// With [`Self::with_feed`] every committed write is echoed to the feed, as
/// the hosted realtime service does for the bookmark table.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    state: Mutex<MemoryState>,
    feed: Option<BroadcastChangeFeed>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing rows (any owner).
    #[must_use]
    pub fn with_rows(rows: Vec<Bookmark>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                rows,
                ..MemoryState::default()
            }),
            feed: None,
        }
    }

    /// Echo committed writes to `feed`.
    #[must_use]
    pub fn with_feed(mut self, feed: BroadcastChangeFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Make the next insert fail with an API error.
    pub async fn fail_next_insert(&self) {
        self.state.lock().await.fail_next_insert = true;
    }

    /// Make the next delete fail with an API error.
    pub async fn fail_next_delete(&self) {
        self.state.lock().await.fail_next_delete = true;
    }

    /// Change a title, as another session editing the row would.
    pub async fn rename(&self, id: &BookmarkId, title: &str) -> Result<Bookmark> {
        let updated = {
            let mut state = self.state.lock().await;
            let row = state
                .rows
                .iter_mut()
                .find(|row| &row.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            title.trim().clone_into(&mut row.title);
            row.clone()
        };
        self.echo(RemoteChange::Update(updated.clone()));
        Ok(updated)
    }

    /// All stored rows regardless of owner, in storage order.
    pub async fn rows(&self) -> Vec<Bookmark> {
        self.state.lock().await.rows.clone()
    }

    fn echo(&self, change: RemoteChange) {
        if let Some(feed) = &self.feed {
            feed.publish(change);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load_owned(&self, user_id: &UserId) -> Result<Vec<Bookmark>> {
        let mut rows: Vec<Bookmark> = self
            .state
            .lock()
            .await
            .rows
            .iter()
            .filter(|row| row.is_owned_by(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert(&self, draft: &BookmarkDraft, user_id: &UserId) -> Result<Bookmark> {
        let bookmark = {
            let mut state = self.state.lock().await;
            if std::mem::take(&mut state.fail_next_insert) {
                return Err(Error::Api("insert rejected".to_string()));
            }
            let bookmark = draft.clone().into_bookmark(
                BookmarkId::generate(),
                user_id.clone(),
                Utc::now(),
            );
            state.rows.push(bookmark.clone());
            bookmark
        };
        self.echo(RemoteChange::Insert(bookmark.clone()));
        Ok(bookmark)
    }

    async fn delete_by_id(&self, id: &BookmarkId) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if std::mem::take(&mut state.fail_next_delete) {
                return Err(Error::Api("delete rejected".to_string()));
            }
            let before = state.rows.len();
            state.rows.retain(|row| &row.id != id);
            if state.rows.len() == before {
                return Ok(());
            }
        }
        self.echo(RemoteChange::Delete(id.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::feed::ChangeFeed;

    fn user(raw: &str) -> UserId {
        raw.parse().unwrap()
    }

    fn row(id: &str, owner: &str, minutes: i64) -> Bookmark {
        Bookmark {
            id: id.parse().unwrap(),
            title: id.to_string(),
            url: "https://example.com".to_string(),
            user_id: user(owner),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_owned_filters_owner_and_sorts_newest_first() {
        let store = MemoryRecordStore::with_rows(vec![
            row("old", "user-1", 1),
            row("foreign", "user-2", 5),
            row("new", "user-1", 10),
        ]);

        let rows = store.load_owned(&user("user-1")).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|row| row.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn insert_assigns_identity_and_echoes() {
        let feed = BroadcastChangeFeed::default();
        let store = MemoryRecordStore::new().with_feed(feed.clone());
        let mut subscription = feed.subscribe();

        let draft = BookmarkDraft::new("Docs", "https://docs.rs").unwrap();
        let created = store.insert(&draft, &user("user-1")).await.unwrap();

        assert_eq!(created.title, "Docs");
        assert!(created.is_owned_by(&user("user-1")));
        assert_eq!(
            subscription.next().await,
            Some(RemoteChange::Insert(created))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn injected_failures_apply_once() {
        let store = MemoryRecordStore::with_rows(vec![row("a", "user-1", 0)]);
        let id: BookmarkId = "a".parse().unwrap();

        store.fail_next_delete().await;
        assert!(matches!(store.delete_by_id(&id).await, Err(Error::Api(_))));
        assert_eq!(store.rows().await.len(), 1);

        store.delete_by_id(&id).await.unwrap();
        assert!(store.rows().await.is_empty());

        store.fail_next_insert().await;
        let draft = BookmarkDraft::new("x", "y").unwrap();
        assert!(store.insert(&draft, &user("user-1")).await.is_err());
        assert!(store.insert(&draft, &user("user-1")).await.is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn rename_updates_row_and_reports_missing() {
        let store = MemoryRecordStore::with_rows(vec![row("a", "user-1", 0)]);
        let renamed = store.rename(&"a".parse().unwrap(), " Renamed ").await.unwrap();
        assert_eq!(renamed.title, "Renamed");

        let missing = store.rename(&"zzz".parse().unwrap(), "x").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
