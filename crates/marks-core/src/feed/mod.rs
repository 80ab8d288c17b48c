//! Change feed plumbing
//!
//! A [`ChangeFeed`] hands out [`Subscription`]s: explicit, cancellable
//! handles that deliver [`RemoteChange`]s in the order the source produced
//! them. Cancelling (or dropping) a subscription stops delivery for good.

mod broadcast;
mod payload;
mod poll;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::reconcile::RemoteChange;

pub use broadcast::BroadcastChangeFeed;
pub use payload::{decode_change, RawChange};
pub use poll::{diff_snapshots, PollingChangeFeed};

/// Buffered events per subscription before the producer waits.
const SUBSCRIPTION_BUFFER: usize = 256;

/// A source of remote change events.
pub trait ChangeFeed: Send + Sync {
    /// Start receiving events from now on.
    ///
    /// Must be called from within a tokio runtime.
    fn subscribe(&self) -> Subscription;
}

/// A live subscription to a change feed.
#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::Receiver<RemoteChange>,
    worker: Option<JoinHandle<()>>,
    cancelled: bool,
}

impl Subscription {
    /// Create a channel pair: the sender side goes to the producing task.
    pub(crate) fn channel() -> (mpsc::Sender<RemoteChange>, mpsc::Receiver<RemoteChange>) {
        mpsc::channel(SUBSCRIPTION_BUFFER)
    }

    /// Wrap a receiver fed by `worker`; the worker is aborted on cancel.
    pub(crate) fn new(
        receiver: mpsc::Receiver<RemoteChange>,
        worker: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            receiver,
            worker,
            cancelled: false,
        }
    }

    /// Next event, or `None` once the feed closed or the subscription was
    /// cancelled.
    pub async fn next(&mut self) -> Option<RemoteChange> {
        if self.cancelled {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stop delivery. Events still buffered are discarded.
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        self.receiver.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Bookmark;

    fn change(id: &str) -> RemoteChange {
        RemoteChange::Insert(Bookmark {
            id: id.parse().unwrap(),
            title: id.to_uppercase(),
            url: "https://example.com".to_string(),
            user_id: "user-1".parse().unwrap(),
            created_at: Utc::now(),
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscription_delivers_in_order() {
        let (sender, receiver) = Subscription::channel();
        let mut subscription = Subscription::new(receiver, None);

        sender.send(change("a")).await.unwrap();
        sender.send(change("b")).await.unwrap();
        drop(sender);

        assert_eq!(subscription.next().await.unwrap().id().as_str(), "a");
        assert_eq!(subscription.next().await.unwrap().id().as_str(), "b");
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cancel_stops_delivery_and_closes_producer() {
        let (sender, receiver) = Subscription::channel();
        let mut subscription = Subscription::new(receiver, None);

        sender.send(change("a")).await.unwrap();
        subscription.cancel();

        assert!(subscription.is_cancelled());
        assert!(subscription.next().await.is_none());
        assert!(sender.send(change("b")).await.is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn drop_closes_producer() {
        let (sender, receiver) = Subscription::channel();
        drop(Subscription::new(receiver, None));
        assert!(sender.is_closed());
    }
}
