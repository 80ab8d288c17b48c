use std::io;

use crate::commands::common::{open_session, write_bookmarks};
use crate::error::CliError;

pub async fn run_list(as_json: bool, profile: Option<&str>) -> Result<(), CliError> {
    let mut session = open_session(profile).await?;
    let bookmarks = session.view("").await;
    session.end().await;

    write_bookmarks(&mut io::stdout().lock(), &bookmarks, as_json)
}
