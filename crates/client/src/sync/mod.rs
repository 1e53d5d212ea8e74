//! Sync engines: the project cache and the article importer.

pub mod articles;
pub mod projects;

pub use articles::{ArticleSyncEngine, SyncReport};
pub use projects::ProjectCacheEngine;
