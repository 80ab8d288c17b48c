//! Error types for marks-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using marks-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in marks-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input, rejected before any backend call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No signed-in user
    #[error("You must be signed in to manage bookmarks")]
    Unauthenticated,

    /// Bookmark not found
    #[error("Bookmark not found: {0}")]
    NotFound(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Record store rejected the request
    #[error("Record store error: {0}")]
    Api(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Identity provider error
    #[error(transparent)]
    Auth(#[from] AuthError),
}
