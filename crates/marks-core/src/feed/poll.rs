//! Change feed that polls the record store.
//!
//! Used where no realtime transport is available: every interval the owned
//! rows are reloaded and compared with the previous load.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use super::{ChangeFeed, Subscription};
use crate::error::{Error, Result};
use crate::models::{Bookmark, UserId};
use crate::reconcile::RemoteChange;
use crate::records::RecordStore;

/// Feed that derives change events from successive owner snapshots.
pub struct PollingChangeFeed<R: RecordStore + 'static> {
    records: Arc<R>,
    user_id: UserId,
    interval: Duration,
}

impl<R: RecordStore + 'static> PollingChangeFeed<R> {
    /// Poll `records` for `user_id` every `interval`, which must be non-zero.
    pub fn new(records: Arc<R>, user_id: UserId, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidInput(
                "Poll interval must be greater than zero".into(),
            ));
        }
        Ok(Self {
            records,
            user_id,
            interval,
        })
    }
}

impl<R: RecordStore + 'static> ChangeFeed for PollingChangeFeed<R> {
    fn subscribe(&self) -> Subscription {
        let (sender, receiver) = Subscription::channel();
        let worker = tokio::spawn(poll_loop(
            Arc::clone(&self.records),
            self.user_id.clone(),
            self.interval,
            sender,
        ));
        Subscription::new(receiver, Some(worker))
    }
}

async fn poll_loop<R: RecordStore>(
    records: Arc<R>,
    user_id: UserId,
    interval: Duration,
    sender: mpsc::Sender<RemoteChange>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut baseline: Option<Vec<Bookmark>> = None;

    loop {
        tokio::select! {
            () = sender.closed() => return,
            _ = ticker.tick() => {}
        }

        let rows = match records.load_owned(&user_id).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!("Polling bookmarks failed: {}", error);
                continue;
            }
        };

        if let Some(previous) = baseline.as_deref() {
            for change in diff_snapshots(previous, &rows) {
                if sender.send(change).await.is_err() {
                    return;
                }
            }
        }
        baseline = Some(rows);
    }
}

/// Change events that turn `previous` into `next`.
///
/// Both snapshots are newest first. Deletes come first, then in-place
/// updates, then inserts oldest first so that prepending each one keeps the
/// newest row at the front.
#[must_use]
pub fn diff_snapshots(previous: &[Bookmark], next: &[Bookmark]) -> Vec<RemoteChange> {
    let before: HashMap<_, _> = previous
        .iter()
        .map(|bookmark| (&bookmark.id, bookmark))
        .collect();
    let after: HashMap<_, _> = next.iter().map(|bookmark| (&bookmark.id, bookmark)).collect();

    let deletes = previous
        .iter()
        .filter(|bookmark| !after.contains_key(&bookmark.id))
        .map(|bookmark| RemoteChange::Delete(bookmark.id.clone()));

    let updates = next.iter().filter_map(|bookmark| {
        before
            .get(&bookmark.id)
            .filter(|old| **old != bookmark)
            .map(|_| RemoteChange::Update(bookmark.clone()))
    });

    let inserts = next
        .iter()
        .rev()
        .filter(|bookmark| !before.contains_key(&bookmark.id))
        .map(|bookmark| RemoteChange::Insert(bookmark.clone()));

    deletes.chain(updates).chain(inserts).collect()
}
