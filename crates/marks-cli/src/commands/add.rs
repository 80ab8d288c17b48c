use marks_core::records::RecordStore;
use marks_core::{Bookmark, BookmarkSession};

use crate::commands::common::open_session;
use crate::error::CliError;

pub async fn run_add(title: &str, url: &str, profile: Option<&str>) -> Result<(), CliError> {
    let mut session = open_session(profile).await?;
    let result = add_bookmark(&session, title, url).await;
    session.end().await;

    println!("{}", result?.id);
    Ok(())
}

pub async fn add_bookmark<R: RecordStore + 'static>(
    session: &BookmarkSession<R>,
    title: &str,
    url: &str,
) -> Result<Bookmark, CliError> {
    Ok(session.add(title, url).await?)
}
