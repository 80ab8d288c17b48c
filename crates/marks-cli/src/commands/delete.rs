use marks_core::records::RecordStore;
use marks_core::{BookmarkId, BookmarkSession};

use crate::commands::common::{open_session, resolve_bookmark_id};
use crate::error::CliError;

pub async fn run_delete(id: &str, profile: Option<&str>) -> Result<(), CliError> {
    let mut session = open_session(profile).await?;
    let result = delete_bookmark(&session, id).await;
    session.end().await;

    println!("{}", result?);
    Ok(())
}

/// Delete the bookmark matching `query` (full ID or unique prefix).
pub async fn delete_bookmark<R: RecordStore + 'static>(
    session: &BookmarkSession<R>,
    query: &str,
) -> Result<BookmarkId, CliError> {
    let id = resolve_bookmark_id(&session.snapshot().await, query)?;
    session.delete(&id).await?;
    Ok(id)
}
