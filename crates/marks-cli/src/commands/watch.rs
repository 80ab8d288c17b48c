use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use marks_core::feed::PollingChangeFeed;
use marks_core::records::RecordStore;
use marks_core::BookmarkSession;

use crate::commands::common::{start_session, write_bookmarks, ProfileContext};
use crate::error::CliError;

pub async fn run_watch(query: &str, profile: Option<&str>) -> Result<(), CliError> {
    let context = ProfileContext::load(profile)?;
    let (user_id, records) = context.records().await?;
    let feed = PollingChangeFeed::new(
        Arc::clone(&records),
        user_id.clone(),
        context.config.poll_interval(),
    )?;
    let mut session = start_session(user_id, records, &feed).await?;
    tracing::info!(
        "Watching bookmarks for profile '{}' every {:?} (Ctrl-C to stop)",
        context.name,
        context.config.poll_interval()
    );

    let result = watch_session(&session, query, tokio::signal::ctrl_c(), &mut io::stdout()).await;
    session.end().await;
    result
}

/// Render the view, then re-render on every change until `shutdown`
/// resolves or the session stops publishing.
pub async fn watch_session<R, S, W>(
    session: &BookmarkSession<R>,
    query: &str,
    shutdown: S,
    out: &mut W,
) -> Result<(), CliError>
where
    R: RecordStore + 'static,
    S: Future,
    W: Write,
{
    let mut observer = session.observe();
    tokio::pin!(shutdown);

    render(session, query, out).await?;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = observer.changed() => {
                if changed.is_err() {
                    break;
                }
                render(session, query, out).await?;
            }
        }
    }
    Ok(())
}

async fn render<R: RecordStore + 'static, W: Write>(
    session: &BookmarkSession<R>,
    query: &str,
    out: &mut W,
) -> Result<(), CliError> {
    let bookmarks = session.view(query).await;
    writeln!(out, "-- {} bookmark(s) --", bookmarks.len())?;
    write_bookmarks(out, &bookmarks, false)?;
    out.flush()?;
    Ok(())
}
