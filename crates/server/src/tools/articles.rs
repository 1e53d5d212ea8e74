//! sync_articles tool implementation.
//!
//! Imports the user's articles from a connected source as posts.

use blogsync_client::{ArticleSource, ArticleSyncEngine, SyncReport};
use blogsync_core::store::integrations::DEVTO_SOURCE;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the sync_articles tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncArticlesParams {
    /// Id of the user whose articles to import.
    pub user_id: i64,

    /// Article source to sync from (default: "devto").
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    DEVTO_SOURCE.into()
}

/// Output from the sync_articles tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SyncArticlesOutput {
    pub source: String,
    #[serde(flatten)]
    pub report: SyncReport,
}

/// Implementation of the sync_articles tool.
pub async fn sync_articles_impl<S: ArticleSource>(
    engine: &ArticleSyncEngine<S>, params: SyncArticlesParams,
) -> Result<CallToolResult, McpError> {
    let report = engine.sync_articles(params.user_id, &params.source).await?;
    json_result(&SyncArticlesOutput { source: params.source, report })
}
