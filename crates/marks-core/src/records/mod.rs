//! Record store: durable storage for bookmark rows

mod memory;
mod postgrest;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Bookmark, BookmarkDraft, BookmarkId, UserId};

pub use memory::MemoryRecordStore;
pub use postgrest::PostgrestRecordStore;

/// Trait for bookmark storage operations
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// List the user's bookmarks, newest first
    async fn load_owned(&self, user_id: &UserId) -> Result<Vec<Bookmark>>;

    /// Persist a new bookmark and return the stored row
    async fn insert(&self, draft: &BookmarkDraft, user_id: &UserId) -> Result<Bookmark>;

    /// Delete a bookmark by ID
    async fn delete_by_id(&self, id: &BookmarkId) -> Result<()>;
}
