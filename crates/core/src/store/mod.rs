//! SQLite-backed persistence for the sync engines.
//!
//! Each submodule adds methods to [`Db`] for one table family:
//!
//! - project cache records and per-user API credentials
//! - integrations (configured article sources)
//! - fetch links binding external articles to local posts
//! - posts, as far as the sync engines need them

pub mod connection;
pub mod credentials;
pub mod integrations;
pub mod links;
pub mod migrations;
pub mod posts;
pub mod projects;

pub use crate::Error;

pub use connection::Db;
pub use integrations::{Integration, IntegrationWithLinks, LinkSummary};
pub use links::FetchLink;
pub use posts::{NewPost, Post};
pub use projects::{CacheStatus, ProjectCacheRecord};

use chrono::{DateTime, SecondsFormat, Utc};

/// Render a timestamp in the fixed-width form stored in every table.
///
/// Fixed width keeps lexical order equal to chronological order, which the
/// `ORDER BY fetched_at` queries rely on.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now() -> String {
    timestamp(Utc::now())
}
