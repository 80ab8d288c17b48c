//! Client configuration for the hosted backend.
//!
//! Provides a unified `ClientConfig` used by the record store, the polling
//! change feed, and the CLI to reach the Supabase project that hosts auth and
//! the bookmark table.

use std::env;
use std::time::Duration;

use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_TABLE: &str = "MARKS_TABLE";
pub const ENV_POLL_INTERVAL_SECS: &str = "MARKS_POLL_INTERVAL_SECS";

/// Table holding bookmark rows.
pub const DEFAULT_TABLE: &str = "bookmarks";
/// How often the polling feed reloads the owned rows.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Connection settings for one Supabase project.
///
/// The anon key is a public, safe-to-ship key; per-user access goes through
/// the access token of a signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    supabase_url: String,
    anon_key: String,
    table: String,
    poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(supabase_url: impl AsRef<str>, anon_key: impl AsRef<str>) -> Result<Self> {
        let supabase_url = supabase_url.as_ref().trim().trim_end_matches('/');
        if supabase_url.is_empty() {
            return Err(Error::InvalidInput("Supabase URL must not be empty".into()));
        }
        if !is_http_url(supabase_url) {
            return Err(Error::InvalidInput(
                "Supabase URL must include http:// or https://".into(),
            ));
        }
        let anon_key = anon_key.as_ref().trim();
        if anon_key.is_empty() {
            return Err(Error::InvalidInput(
                "Supabase anon key must not be empty".into(),
            ));
        }

        Ok(Self {
            supabase_url: supabase_url.to_string(),
            anon_key: anon_key.to_string(),
            table: DEFAULT_TABLE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when neither URL nor key is set, and an error when
    /// only one of them is.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>> {
        let url = normalize_text_option(lookup(ENV_SUPABASE_URL));
        let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));

        let mut config = match (url, anon_key) {
            (None, None) => return Ok(None),
            (Some(url), Some(anon_key)) => Self::new(url, anon_key)?,
            _ => {
                return Err(Error::InvalidInput(format!(
                    "{ENV_SUPABASE_URL} and {ENV_SUPABASE_ANON_KEY} must be set together"
                )))
            }
        };

        if let Some(table) = normalize_text_option(lookup(ENV_TABLE)) {
            config = config.with_table(&table)?;
        }
        if let Some(raw) = normalize_text_option(lookup(ENV_POLL_INTERVAL_SECS)) {
            let secs = raw.parse::<u64>().map_err(|_| {
                Error::InvalidInput(format!("{ENV_POLL_INTERVAL_SECS} must be a whole number"))
            })?;
            config = config.with_poll_interval(Duration::from_secs(secs))?;
        }

        Ok(Some(config))
    }

    /// Use a different table name.
    pub fn with_table(mut self, table: &str) -> Result<Self> {
        self.table = normalize_table_name(table)?;
        Ok(self)
    }

    /// Set the polling feed interval. Zero is rejected.
    pub fn with_poll_interval(mut self, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidInput(
                "Poll interval must be greater than zero".into(),
            ));
        }
        self.poll_interval = interval;
        Ok(self)
    }

    #[must_use]
    pub fn supabase_url(&self) -> &str {
        &self.supabase_url
    }

    #[must_use]
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// PostgREST endpoint for the bookmark table.
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.supabase_url, self.table)
    }
}

/// Trimmed value, or `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

pub fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}

pub fn normalize_table_name(raw: &str) -> Result<String> {
    let table = raw.trim();
    let valid = !table.is_empty()
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(table.to_string())
    } else {
        Err(Error::InvalidInput(format!(
            "Table name '{table}' must be non-empty and contain only letters, digits, or '_'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn blank_text_normalizes_to_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t ".to_string())), None);
        assert_eq!(
            normalize_text_option(Some(" anon-key ".to_string())),
            Some("anon-key".to_string())
        );
    }

    #[test]
    fn only_http_schemes_count_as_urls() {
        assert!(is_http_url(" https://demo.supabase.co"));
        assert!(is_http_url("http://localhost:54321"));
        assert!(!is_http_url("demo.supabase.co"));
        assert!(!is_http_url("ftp://demo.supabase.co"));
    }

    #[test]
    fn new_trims_trailing_slash_and_builds_rest_url() {
        let config = ClientConfig::new("https://demo.supabase.co/ ", "anon").unwrap();
        assert_eq!(config.supabase_url(), "https://demo.supabase.co");
        assert_eq!(
            config.rest_url(),
            "https://demo.supabase.co/rest/v1/bookmarks"
        );
    }

    #[test]
    fn new_rejects_invalid_values() {
        assert!(ClientConfig::new("demo.supabase.co", "anon").is_err());
        assert!(ClientConfig::new("https://demo.supabase.co", "  ").is_err());
    }

    #[test]
    fn lookup_returns_none_when_unset() {
        assert!(ClientConfig::from_lookup(lookup_from(&[])).unwrap().is_none());
    }

    #[test]
    fn lookup_rejects_partial_configuration() {
        let lookup = lookup_from(&[(ENV_SUPABASE_URL, "https://demo.supabase.co")]);
        let error = ClientConfig::from_lookup(lookup).unwrap_err();
        assert!(error.to_string().contains("must be set together"));
    }

    #[test]
    fn lookup_applies_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_SUPABASE_URL, "https://demo.supabase.co"),
            (ENV_SUPABASE_ANON_KEY, "anon"),
            (ENV_TABLE, "saved_links"),
            (ENV_POLL_INTERVAL_SECS, "30"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(config.table(), "saved_links");
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn table_and_interval_are_validated() {
        let config = ClientConfig::new("https://demo.supabase.co", "anon").unwrap();
        assert!(config.clone().with_table("bookmarks; drop").is_err());
        assert!(config.with_poll_interval(Duration::ZERO).is_err());
    }
}
