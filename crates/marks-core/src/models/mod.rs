//! Data models for marks

mod bookmark;
mod ids;

pub use bookmark::{Bookmark, BookmarkDraft};
pub use ids::{BookmarkId, UserId};
