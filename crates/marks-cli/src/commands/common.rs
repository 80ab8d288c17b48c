use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marks_core::config::ClientConfig;
use marks_core::feed::{BroadcastChangeFeed, ChangeFeed};
use marks_core::records::{PostgrestRecordStore, RecordStore};
use marks_core::{Bookmark, BookmarkId, BookmarkSession, UserId};
use serde::Serialize;

use crate::auth::{AuthError, AuthSession, SupabaseAuthService};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

const SHORT_ID_LEN: usize = 13;
const TITLE_COLUMN_WIDTH: usize = 40;

#[derive(Debug, Serialize)]
pub struct BookmarkListItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: String,
    pub relative_time: String,
}

/// Resolved profile: backend settings plus the auth client for that profile.
pub struct ProfileContext {
    pub name: String,
    pub config: ClientConfig,
    pub auth: SupabaseAuthService,
}

impl ProfileContext {
    pub fn load(global_profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let name = profiles.resolve_profile_name(global_profile);
        let not_configured = || {
            CliError::Config(format!(
                "Profile '{name}' is not configured. Run `marks config init --profile {name}` first."
            ))
        };
        let config = resolve_client_config(profiles.profile(&name), ClientConfig::from_env)?
            .ok_or_else(not_configured)?;
        Self::new(name, config)
    }

    pub fn new(name: String, config: ClientConfig) -> Result<Self, CliError> {
        let auth = SupabaseAuthService::new(&name, config.supabase_url(), config.anon_key())
            .map_err(auth_error)?;
        Ok(Self { name, config, auth })
    }

    /// The stored session, refreshed if needed.
    pub async fn signed_in(&self) -> Result<AuthSession, CliError> {
        let session = self.auth.restore_session().await.map_err(auth_error)?;
        if session.is_none() {
            tracing::debug!("No stored session for profile '{}'", self.name);
        }
        session.ok_or(CliError::Core(marks_core::Error::Unauthenticated))
    }

    /// Record store acting as the signed-in user.
    pub async fn records(&self) -> Result<(UserId, Arc<PostgrestRecordStore>), CliError> {
        let session = self.signed_in().await?;
        let user_id = session.user_id().map_err(auth_error)?;
        let records = PostgrestRecordStore::new(&self.config, session.access_token)?;
        Ok((user_id, Arc::new(records)))
    }
}

/// Backend settings from the stored profile, falling back to the environment
/// when the profile has no Supabase project.
pub fn resolve_client_config(
    profile: Option<&CliProfile>,
    env_config: impl FnOnce() -> Result<Option<ClientConfig>, marks_core::Error>,
) -> Result<Option<ClientConfig>, CliError> {
    if let Some(config) = profile.map(CliProfile::client_config).transpose()?.flatten() {
        return Ok(Some(config));
    }
    Ok(env_config()?)
}

#[allow(clippy::needless_pass_by_value)]
pub fn auth_error(error: AuthError) -> CliError {
    CliError::Auth(error.to_string())
}

/// Session for a one-shot command. Nothing is published on its feed, so the
/// view is the loaded snapshot plus this command's own writes.
pub async fn open_session(
    global_profile: Option<&str>,
) -> Result<BookmarkSession<PostgrestRecordStore>, CliError> {
    let context = ProfileContext::load(global_profile)?;
    let (user_id, records) = context.records().await?;
    start_session(user_id, records, &BroadcastChangeFeed::default()).await
}

pub async fn start_session<R, F>(
    user_id: UserId,
    records: Arc<R>,
    feed: &F,
) -> Result<BookmarkSession<R>, CliError>
where
    R: RecordStore + 'static,
    F: ChangeFeed + ?Sized,
{
    Ok(BookmarkSession::start(user_id, records, feed).await?)
}

/// Resolve a full bookmark ID or a unique prefix of one.
pub fn resolve_bookmark_id(bookmarks: &[Bookmark], query: &str) -> Result<BookmarkId, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::EmptyBookmarkId);
    }

    if let Some(bookmark) = bookmarks.iter().find(|bookmark| bookmark.id.as_str() == query) {
        return Ok(bookmark.id.clone());
    }

    let matching: Vec<&BookmarkId> = bookmarks
        .iter()
        .map(|bookmark| &bookmark.id)
        .filter(|id| id.as_str().starts_with(query))
        .collect();

    match matching.as_slice() {
        [] => Err(CliError::BookmarkNotFound(query.to_string())),
        [id] => Ok((*id).clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|id| short_id(id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousBookmarkId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn short_id(id: &BookmarkId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

pub fn format_bookmark_lines(bookmarks: &[Bookmark], now: DateTime<Utc>) -> Vec<String> {
    bookmarks
        .iter()
        .map(|bookmark| {
            let short_id = short_id(&bookmark.id);
            let title = truncate_text(&bookmark.title, TITLE_COLUMN_WIDTH);
            let relative_time = format_relative_time(bookmark.created_at, now);
            format!(
                "{short_id:<13}  {title:<40}  {relative_time:<10}  {}",
                bookmark.url
            )
        })
        .collect()
}

pub fn bookmark_to_list_item(bookmark: &Bookmark, now: DateTime<Utc>) -> BookmarkListItem {
    BookmarkListItem {
        id: bookmark.id.to_string(),
        title: bookmark.title.clone(),
        url: bookmark.url.clone(),
        created_at: bookmark.created_at.to_rfc3339(),
        relative_time: format_relative_time(bookmark.created_at, now),
    }
}

/// Print bookmarks as aligned lines or as a JSON array.
pub fn write_bookmarks(
    out: &mut impl Write,
    bookmarks: &[Bookmark],
    as_json: bool,
) -> Result<(), CliError> {
    let now = Utc::now();
    if as_json {
        let items = bookmarks
            .iter()
            .map(|bookmark| bookmark_to_list_item(bookmark, now))
            .collect::<Vec<BookmarkListItem>>();
        writeln!(out, "{}", serde_json::to_string_pretty(&items)?)?;
    } else {
        for line in format_bookmark_lines(bookmarks, now) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp).num_milliseconds().max(0);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
