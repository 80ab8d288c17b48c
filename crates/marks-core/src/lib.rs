//! marks-core - Core library for marks
//!
//! This crate contains the bookmark models, the reconciliation store that
//! merges local optimistic mutations with the live change feed, and the
//! clients for the hosted auth and record services used by every marks
//! interface.

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod reconcile;
pub mod records;
pub mod search;
pub mod session;

pub use error::{Error, Result};
pub use models::{Bookmark, BookmarkDraft, BookmarkId, UserId};
pub use reconcile::{BookmarkStore, RemoteChange};
pub use session::BookmarkSession;
