//! Record store backed by the hosted REST interface over the bookmark table.
//!
//! Row-level access is enforced server-side through the bearer token; the
//! owner filter on reads is still sent so results match the local view.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::RecordStore;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{Bookmark, BookmarkDraft, BookmarkId, UserId};

const ERROR_BODY_LIMIT: usize = 180;

/// REST client for the bookmark table.
#[derive(Debug, Clone)]
pub struct PostgrestRecordStore {
    rest_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct InsertRow<'a> {
    title: &'a str,
    url: &'a str,
    user_id: &'a str,
}

impl PostgrestRecordStore {
    /// Build a store acting on behalf of the holder of `access_token`.
    pub fn new(config: &ClientConfig, access_token: impl Into<String>) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(Error::Unauthenticated);
        }
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.anon_key().to_string(),
            access_token,
            client: Client::builder().build()?,
        })
    }

    #[must_use]
    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl RecordStore for PostgrestRecordStore {
    async fn load_owned(&self, user_id: &UserId) -> Result<Vec<Bookmark>> {
        let owner = format!("eq.{user_id}");
        let response = self
            .authorized(self.client.get(&self.rest_url))
            .query(&[
                ("select", "*"),
                ("user_id", owner.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;
        let response = ensure_success(response, "Loading bookmarks").await?;
        Ok(response.json::<Vec<Bookmark>>().await?)
    }

    async fn insert(&self, draft: &BookmarkDraft, user_id: &UserId) -> Result<Bookmark> {
        let row = InsertRow {
            title: draft.title(),
            url: draft.url(),
            user_id: user_id.as_str(),
        };
        let response = self
            .authorized(self.client.post(&self.rest_url))
            .header("Prefer", "return=representation")
            .json(&[row])
            .send()
            .await?;
        let response = ensure_success(response, "Adding bookmark").await?;
        response
            .json::<Vec<Bookmark>>()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Api("Insert returned no row".to_string()))
    }

    async fn delete_by_id(&self, id: &BookmarkId) -> Result<()> {
        let filter = format!("eq.{id}");
        let response = self
            .authorized(self.client.delete(&self.rest_url))
            .query(&[("id", filter.as_str())])
            .send()
            .await?;
        ensure_success(response, "Deleting bookmark").await?;
        Ok(())
    }
}

async fn ensure_success(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} failed with HTTP {}: {}", action, status.as_u16(), compact_text(&body));
    Err(Error::Api(format!("{action} failed: {}", parse_api_error(status, &body))))
}

fn compact_text(value: &str) -> String {
    value.trim().chars().take(ERROR_BODY_LIMIT).collect()
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<PostgrestErrorResponse>(body) {
        if let Some(message) = payload.message {
            let mut text = message.trim().to_string();
            for extra in [payload.details, payload.hint].into_iter().flatten() {
                let extra = extra.trim();
                if !extra.is_empty() {
                    text.push_str(": ");
                    text.push_str(extra);
                }
            }
            return format!("{text} ({})", status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("https://demo.supabase.co/", "anon-key").unwrap()
    }

    #[test]
    fn new_requires_access_token() {
        let result = PostgrestRecordStore::new(&config(), "  ");
        assert!(matches!(result, Err(Error::Unauthenticated)));
    }

    #[test]
    fn rest_url_targets_configured_table() {
        let store = PostgrestRecordStore::new(&config(), "token").unwrap();
        assert_eq!(store.rest_url(), "https://demo.supabase.co/rest/v1/bookmarks");
    }

    #[test]
    fn insert_body_is_a_single_row_array() {
        let draft = BookmarkDraft::new("Rust", "https://rust-lang.org").unwrap();
        let row = InsertRow {
            title: draft.title(),
            url: draft.url(),
            user_id: "user-1",
        };
        let body = serde_json::to_value([row]).unwrap();
        assert_eq!(
            body,
            serde_json::json!([
                {"title": "Rust", "url": "https://rust-lang.org", "user_id": "user-1"}
            ])
        );
    }

    #[test]
    fn parse_api_error_joins_message_details_and_hint() {
        let message = parse_api_error(
            StatusCode::FORBIDDEN,
            r#"{"code":"42501","message":"permission denied","details":null,"hint":"check policies"}"#,
        );
        assert_eq!(message, "permission denied: check policies (403)");
    }

    #[test]
    fn parse_api_error_falls_back_to_body_or_status() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down (502)"
        );
        assert_eq!(parse_api_error(StatusCode::NOT_FOUND, "  "), "HTTP 404");
    }

    #[test]
    fn unstructured_error_bodies_are_truncated() {
        let body = format!("<html>{}</html>", "x".repeat(500));
        let message = parse_api_error(StatusCode::BAD_GATEWAY, &body);
        assert_eq!(message, format!("{} (502)", &body[..ERROR_BODY_LIMIT]));
    }
}
