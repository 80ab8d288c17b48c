//! Decoding of realtime `postgres_changes` payloads.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{Bookmark, BookmarkId};
use crate::reconcile::RemoteChange;

/// One row-level change notification as the realtime service ships it.
///
/// `new` carries the full row for inserts and updates. For deletes only
/// `old.id` is guaranteed unless the table uses full replica identity.
#[derive(Debug, Clone, Deserialize)]
pub struct RawChange {
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl RawChange {
    /// Convert into a typed change, or `None` when the payload is unusable.
    #[must_use]
    pub fn into_remote_change(self) -> Option<RemoteChange> {
        match self.event_type.to_ascii_uppercase().as_str() {
            "INSERT" => full_row(self.new).map(RemoteChange::Insert),
            "UPDATE" => full_row(self.new).map(RemoteChange::Update),
            "DELETE" => deleted_id(self.old).map(RemoteChange::Delete),
            other => {
                tracing::debug!("Discarding change with unknown event type '{}'", other);
                None
            }
        }
    }
}

/// Decode a JSON payload into a typed change.
///
/// Malformed payloads are logged and discarded, never surfaced as errors.
#[must_use]
pub fn decode_change(payload: &str) -> Option<RemoteChange> {
    match serde_json::from_str::<RawChange>(payload) {
        Ok(raw) => raw.into_remote_change(),
        Err(error) => {
            tracing::debug!("Discarding malformed change payload: {}", error);
            None
        }
    }
}

fn full_row(row: Option<Value>) -> Option<Bookmark> {
    let row = row?;
    match serde_json::from_value::<Bookmark>(row) {
        Ok(bookmark) if !bookmark.id.as_str().trim().is_empty() => Some(bookmark),
        Ok(_) => {
            tracing::debug!("Discarding change row with an empty id");
            None
        }
        Err(error) => {
            tracing::debug!("Discarding change row that is not a bookmark: {}", error);
            None
        }
    }
}

fn deleted_id(old: Option<Value>) -> Option<BookmarkId> {
    old?.get("id")?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"{
        "id": "b-1",
        "title": "Morning News",
        "url": "https://news.example.com",
        "user_id": "user-1",
        "created_at": "2024-05-01T08:30:00+00:00"
    }"#;

    #[test]
    fn decodes_insert_and_update() {
        let insert = decode_change(&format!(r#"{{"eventType":"INSERT","new":{ROW},"old":{{}}}}"#));
        assert!(matches!(insert, Some(RemoteChange::Insert(ref bookmark)) if bookmark.title == "Morning News"));

        let update = decode_change(&format!(r#"{{"eventType":"UPDATE","new":{ROW},"old":{{"id":"b-1"}}}}"#));
        assert!(matches!(update, Some(RemoteChange::Update(_))));
    }

    #[test]
    fn decodes_delete_with_id_only() {
        let change = decode_change(r#"{"eventType":"DELETE","new":{},"old":{"id":"b-1"}}"#);
        assert_eq!(change, Some(RemoteChange::Delete("b-1".parse().unwrap())));
    }

    #[test]
    fn discards_unknown_event_types() {
        assert!(decode_change(r#"{"eventType":"TRUNCATE","new":{},"old":{}}"#).is_none());
    }

    #[test]
    fn discards_missing_or_partial_rows() {
        assert!(decode_change(r#"{"eventType":"INSERT"}"#).is_none());
        assert!(decode_change(r#"{"eventType":"UPDATE","new":{"id":"b-1","title":"x"}}"#).is_none());
        assert!(decode_change(r#"{"eventType":"DELETE","old":{}}"#).is_none());
        assert!(decode_change(r#"{"eventType":"DELETE","old":{"id":""}}"#).is_none());
    }

    #[test]
    fn discards_invalid_json() {
        assert!(decode_change("not json").is_none());
        assert!(decode_change(r#"{"new":{}}"#).is_none());
    }
}
