//! Seams between the sync engines and the upstream APIs.

use async_trait::async_trait;

use crate::ApiError;
use crate::devto::ExternalArticle;

/// An API that lists a user's projects.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// URL requested by [`fetch_projects`](Self::fetch_projects); recorded
    /// on each cache row.
    fn projects_url(&self) -> &str;

    /// Fetch the raw project list body using the user's bearer token.
    async fn fetch_projects(&self, token: &str) -> Result<String, ApiError>;
}

/// An API that lists a user's published articles.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Integration source name this API serves (e.g. "devto").
    fn name(&self) -> &'static str;

    /// Fetch the article list from an integration's `location`.
    ///
    /// The envelope must decode as a list; individual items are validated
    /// later, one at a time.
    async fn fetch_articles(&self, location: &str, token: &str) -> Result<Vec<ExternalArticle>, ApiError>;
}
