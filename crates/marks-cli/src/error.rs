use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] marks_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Bookmark ID cannot be empty")]
    EmptyBookmarkId,
    #[error("Bookmark not found for id/prefix: {0}")]
    BookmarkNotFound(String),
    #[error("{0}")]
    AmbiguousBookmarkId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
}
