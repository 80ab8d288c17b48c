//! In-process change feed.

use tokio::sync::broadcast;

use super::{decode_change, ChangeFeed, Subscription};
use crate::reconcile::RemoteChange;

/// Fan-out feed for changes produced inside the process.
///
/// A subscriber that falls more than `capacity` events behind is closed.
///
/// Bridges any transport that yields raw payloads (see [`Self::publish_raw`])
/// and lets the in-memory record store echo its writes the way the hosted
/// realtime service does.
#[derive(Debug, Clone)]
pub struct BroadcastChangeFeed {
    sender: broadcast::Sender<RemoteChange>,
}

impl BroadcastChangeFeed {
    /// Create a feed that buffers up to `capacity` events per slow subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a change to every current subscriber.
    pub fn publish(&self, change: RemoteChange) {
        // No subscribers is fine; the change is simply not observed.
        let _ = self.sender.send(change);
    }

    /// Decode and publish a raw realtime payload. Returns whether it was
    /// usable.
    pub fn publish_raw(&self, payload: &str) -> bool {
        let Some(change) = decode_change(payload) else {
            return false;
        };
        self.publish(change);
        true
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastChangeFeed {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChangeFeed for BroadcastChangeFeed {
    fn subscribe(&self) -> Subscription {
        let mut source = self.sender.subscribe();
        let (sender, receiver) = Subscription::channel();

        let worker = tokio::spawn(async move {
            loop {
                let change = tokio::select! {
                    () = sender.closed() => break,
                    received = source.recv() => received,
                };
                match change {
                    Ok(change) => {
                        if sender.send(change).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Skipped events cannot be replayed.
                        tracing::warn!(
                            "Change feed subscriber lagged by {} events; closing subscription",
                            skipped
                        );
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(receiver, Some(worker))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Bookmark;

    fn insert(id: &str) -> RemoteChange {
        RemoteChange::Insert(Bookmark {
            id: id.parse().unwrap(),
            title: id.to_string(),
            url: "https://example.com".to_string(),
            user_id: "user-1".parse().unwrap(),
            created_at: Utc::now(),
        })
    }

    #[tokio::test(flavor = "current_thread")]
    async fn subscribers_receive_events_published_after_subscribing() {
        let feed = BroadcastChangeFeed::default();
        feed.publish(insert("before"));

        let mut first = feed.subscribe();
        let mut second = feed.subscribe();
        feed.publish(insert("a"));
        feed.publish(RemoteChange::Delete("a".parse().unwrap()));

        for subscription in [&mut first, &mut second] {
            assert_eq!(subscription.next().await.unwrap().kind(), "insert");
            assert_eq!(subscription.next().await.unwrap().kind(), "delete");
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn publish_raw_decodes_payloads() {
        let feed = BroadcastChangeFeed::default();
        let mut subscription = feed.subscribe();

        assert!(!feed.publish_raw(r#"{"eventType":"TRUNCATE"}"#));
        assert!(feed.publish_raw(r#"{"eventType":"DELETE","old":{"id":"b-9"}}"#));

        let change = subscription.next().await.unwrap();
        assert_eq!(change, RemoteChange::Delete("b-9".parse().unwrap()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cancelled_subscription_releases_the_source() {
        let feed = BroadcastChangeFeed::default();
        let mut subscription = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        subscription.cancel();
        tokio::task::yield_now().await;
        feed.publish(insert("late"));

        assert!(subscription.next().await.is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn lagging_subscriber_is_closed() {
        let feed = BroadcastChangeFeed::new(1);
        let mut subscription = feed.subscribe();

        feed.publish(insert("a"));
        feed.publish(insert("b"));
        feed.publish(insert("c"));

        assert!(subscription.next().await.is_none());
    }
}
