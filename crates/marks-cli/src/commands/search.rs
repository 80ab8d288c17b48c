use std::io;

use crate::commands::common::{open_session, write_bookmarks};
use crate::error::CliError;

pub async fn run_search(query: &str, as_json: bool, profile: Option<&str>) -> Result<(), CliError> {
    let mut session = open_session(profile).await?;
    let bookmarks = session.view(query).await;
    session.end().await;

    write_bookmarks(&mut io::stdout().lock(), &bookmarks, as_json)
}
