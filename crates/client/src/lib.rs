//! Client code for blog-sync.
//!
//! This crate provides the devpad and dev.to API clients and the two engines
//! built on them: the project cache and the article sync.

pub mod devpad;
pub mod devto;
pub mod error;
pub mod http;
pub mod source;
pub mod sync;

pub use devpad::DevpadClient;
pub use devto::{DevToClient, ExternalArticle};
pub use error::ApiError;
pub use http::{HttpClient, HttpConfig};
pub use source::{ArticleSource, ProjectSource};
pub use sync::{ArticleSyncEngine, ProjectCacheEngine, SyncReport};
