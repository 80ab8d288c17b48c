//! Bookmark session: one signed-in user's live view of their bookmarks.
//!
//! A session owns the reconciliation store, the record store handle, and the
//! task that applies change-feed events. It is created with
//! [`BookmarkSession::start`] and torn down with [`BookmarkSession::end`].

use std::sync::Arc;

use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::feed::{ChangeFeed, Subscription};
use crate::models::{Bookmark, BookmarkDraft, BookmarkId, UserId};
use crate::reconcile::BookmarkStore;
use crate::records::RecordStore;

/// Live session over a user's bookmarks.
pub struct BookmarkSession<R: RecordStore + 'static> {
    user_id: UserId,
    records: Arc<R>,
    store: Arc<Mutex<BookmarkStore>>,
    observer: watch::Receiver<u64>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl<R: RecordStore + 'static> BookmarkSession<R> {
    /// Load the user's bookmarks, then start applying `feed` events.
    ///
    /// The feed is subscribed only after the snapshot is in place, so the
    /// store never sees events for a collection it has not loaded.
    pub async fn start<F>(user_id: UserId, records: Arc<R>, feed: &F) -> Result<Self>
    where
        F: ChangeFeed + ?Sized,
    {
        let snapshot = records.load_owned(&user_id).await?;
        let store = BookmarkStore::new(user_id.clone(), snapshot);
        let observer = store.subscribe();
        tracing::info!("Started bookmark session for {} ({} bookmarks)", user_id, store.len());

        let store = Arc::new(Mutex::new(store));
        let subscription = feed.subscribe();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(apply_changes(Arc::clone(&store), subscription, shutdown_rx));

        Ok(Self {
            user_id,
            records,
            store,
            observer,
            shutdown: Some(shutdown),
            worker: Some(worker),
        })
    }

    /// Validate, persist, and add a bookmark. Returns the stored row.
    pub async fn add(&self, title: &str, url: &str) -> Result<Bookmark> {
        let draft = BookmarkDraft::new(title, url)?;
        let created = self.records.insert(&draft, &self.user_id).await?;
        self.store.lock().await.apply_local_add(created.clone());
        Ok(created)
    }

    /// Remove a bookmark locally, then delete it from the record store.
    ///
    /// If the record store rejects the delete the bookmark is put back where
    /// it was and the error is returned.
    pub async fn delete(&self, id: &BookmarkId) -> Result<()> {
        let removed = self.store.lock().await.apply_local_delete(id);
        if let Err(error) = self.records.delete_by_id(id).await {
            if let Some(removed) = removed {
                tracing::warn!("Restoring bookmark {} after failed delete: {}", id, error);
                self.store.lock().await.restore_removed(removed);
            }
            return Err(error);
        }
        Ok(())
    }

    /// Bookmarks whose title contains `query`, newest first.
    pub async fn view(&self, query: &str) -> Vec<Bookmark> {
        self.store
            .lock()
            .await
            .visible_view(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<Bookmark> {
        self.store.lock().await.snapshot()
    }

    /// Revision counter that changes whenever the collection does.
    #[must_use]
    pub fn observe(&self) -> watch::Receiver<u64> {
        self.observer.clone()
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Whether feed events are still being applied.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stop applying feed events and wait for the apply task to exit.
    ///
    /// Safe to call more than once.
    pub async fn end(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(worker) = self.worker.take() else {
            return;
        };
        if let Err(error) = worker.await {
            if !error.is_cancelled() {
                tracing::warn!("Bookmark session task failed: {}", error);
            }
        }
        tracing::info!("Ended bookmark session for {}", self.user_id);
    }
}

impl<R: RecordStore + 'static> Drop for BookmarkSession<R> {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn apply_changes(
    store: Arc<Mutex<BookmarkStore>>,
    mut subscription: Subscription,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            change = subscription.next() => {
                let Some(change) = change else {
                    tracing::warn!("Change feed closed; bookmarks will no longer update");
                    break;
                };
                let kind = change.kind();
                let id = change.id().clone();
                let applied = store.lock().await.apply_remote_change(change);
                tracing::debug!("Remote {} for {} (applied: {})", kind, id, applied);
            }
        }
    }
    subscription.cancel();
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::feed::BroadcastChangeFeed;
    use crate::reconcile::RemoteChange;
    use crate::records::MemoryRecordStore;

    fn user() -> UserId {
        "user-1".parse().unwrap()
    }

    fn row(id: &str, owner: &str, minutes: u32) -> Bookmark {
        Bookmark {
            id: id.parse().unwrap(),
            title: format!("Title {id}"),
            url: format!("https://example.com/{id}"),
            user_id: owner.parse().unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, minutes, 0).unwrap(),
        }
    }

    fn ids(bookmarks: &[Bookmark]) -> Vec<&str> {
        bookmarks.iter().map(|bookmark| bookmark.id.as_str()).collect()
    }

    async fn wait_until<R, P>(session: &BookmarkSession<R>, predicate: P)
    where
        R: RecordStore + 'static,
        P: Fn(&[Bookmark]) -> bool,
    {
        let mut observer = session.observe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if predicate(&session.snapshot().await) {
                    return;
                }
                observer.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn start_loads_only_owned_rows_newest_first() {
        let records = Arc::new(MemoryRecordStore::with_rows(vec![
            row("a", "user-1", 1),
            row("x", "user-2", 2),
            row("b", "user-1", 3),
        ]));
        let feed = BroadcastChangeFeed::default();

        let mut session = BookmarkSession::start(user(), records, &feed).await.unwrap();
        assert_eq!(ids(&session.snapshot().await), vec!["b", "a"]);
        assert!(session.is_active());
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn add_rejects_empty_input_before_persisting() {
        let records = Arc::new(MemoryRecordStore::new());
        let feed = BroadcastChangeFeed::default();
        let mut session = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();

        let result = session.add("   ", "https://example.com").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
        assert!(records.rows().await.is_empty());
        assert!(session.snapshot().await.is_empty());
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn local_add_and_its_echo_produce_one_record() {
        let feed = BroadcastChangeFeed::default();
        let records = Arc::new(MemoryRecordStore::new().with_feed(feed.clone()));
        let mut session = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();

        let created = session.add("Rust", "https://rust-lang.org").await.unwrap();

        // A later write; once it lands the echo of the add has been applied.
        let draft = BookmarkDraft::new("Later", "https://example.com").unwrap();
        let later = records.insert(&draft, &user()).await.unwrap();
        wait_until(&session, |rows| rows.iter().any(|row| row.id == later.id)).await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            snapshot.iter().filter(|row| row.id == created.id).count(),
            1
        );
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_insert_leaves_collection_unchanged() {
        let records = Arc::new(MemoryRecordStore::with_rows(vec![row("a", "user-1", 1)]));
        let feed = BroadcastChangeFeed::default();
        let mut session = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();
        let observer = session.observe();
        let revision = *observer.borrow();

        records.fail_next_insert().await;
        let result = session.add("Rust", "https://rust-lang.org").await;

        assert!(matches!(result, Err(Error::Api(_))));
        assert_eq!(ids(&session.snapshot().await), vec!["a"]);
        assert_eq!(*observer.borrow(), revision);
        assert_eq!(records.rows().await.len(), 1);
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failed_delete_restores_record_in_place() {
        let records = Arc::new(MemoryRecordStore::with_rows(vec![
            row("a", "user-1", 3),
            row("b", "user-1", 2),
            row("c", "user-1", 1),
        ]));
        let feed = BroadcastChangeFeed::default();
        let mut session = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();

        records.fail_next_delete().await;
        let result = session.delete(&"b".parse().unwrap()).await;

        assert!(matches!(result, Err(Error::Api(_))));
        assert_eq!(ids(&session.snapshot().await), vec!["a", "b", "c"]);
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn delete_removes_record_and_echo_is_harmless() {
        let feed = BroadcastChangeFeed::default();
        let records = Arc::new(
            MemoryRecordStore::with_rows(vec![row("a", "user-1", 2), row("b", "user-1", 1)])
                .with_feed(feed.clone()),
        );
        let mut session = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();

        session.delete(&"a".parse().unwrap()).await.unwrap();
        assert_eq!(ids(&session.snapshot().await), vec!["b"]);
        assert_eq!(records.rows().await.len(), 1);
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn remote_changes_from_another_session_are_applied() {
        let feed = BroadcastChangeFeed::default();
        let records = Arc::new(MemoryRecordStore::new().with_feed(feed.clone()));
        let mut writer = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();
        let mut reader = BookmarkSession::start(user(), Arc::clone(&records), &feed)
            .await
            .unwrap();

        let created = writer.add("Shared", "https://example.com").await.unwrap();
        wait_until(&reader, |rows| rows.iter().any(|row| row.id == created.id)).await;

        records.rename(&created.id, "Renamed").await.unwrap();
        wait_until(&reader, |rows| rows.iter().any(|row| row.title == "Renamed")).await;
        assert_eq!(reader.view("renamed").await.len(), 1);

        writer.end().await;
        reader.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn session_stops_when_feed_falls_behind() {
        let feed = BroadcastChangeFeed::new(1);
        let records = Arc::new(MemoryRecordStore::new());
        let mut session = BookmarkSession::start(user(), records, &feed).await.unwrap();

        for id in ["a", "b", "c"] {
            feed.publish(RemoteChange::Insert(row(id, "user-1", 0)));
        }

        tokio::time::timeout(Duration::from_secs(2), async {
            while session.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(session.snapshot().await.is_empty());
        session.end().await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn no_events_reach_the_store_after_end() {
        let feed = BroadcastChangeFeed::default();
        let records = Arc::new(MemoryRecordStore::new());
        let mut session = BookmarkSession::start(user(), records, &feed).await.unwrap();

        session.end().await;
        assert!(!session.is_active());

        feed.publish(RemoteChange::Insert(row("late", "user-1", 0)));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(session.snapshot().await.is_empty());
        // Ending twice is a no-op.
        session.end().await;
    }
}
