//! Core types and shared functionality for blog-sync.
//!
//! This crate provides:
//! - SQLite storage for project caches, credentials, integrations, fetch links and posts
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{CacheStatus, Db, FetchLink, Integration, NewPost, Post, ProjectCacheRecord};
