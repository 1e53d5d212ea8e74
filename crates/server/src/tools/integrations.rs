//! Integration tools: list, save and delete a user's article sources.

use blogsync_client::sync::articles::supported_sources;
use blogsync_core::store::integrations::default_location;
use blogsync_core::store::IntegrationWithLinks;
use blogsync_core::{Db, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the list_integrations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListIntegrationsParams {
    pub user_id: i64,
}

/// Output from the list_integrations tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListIntegrationsOutput {
    pub integrations: Vec<IntegrationWithLinks>,
}

/// Parameters for the save_integration tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveIntegrationParams {
    pub user_id: i64,

    /// Article source (e.g. "devto").
    pub source: String,

    /// Endpoint to pull articles from. Defaults to the source's standard
    /// endpoint.
    #[serde(default)]
    pub location: Option<String>,

    /// API token for the source.
    pub token: String,
}

/// Output from the save_integration tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SaveIntegrationOutput {
    pub integration_id: i64,
    pub location: String,
}

/// Parameters for the delete_integration tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeleteIntegrationParams {
    pub integration_id: i64,
}

/// Output from the delete_integration tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteIntegrationOutput {
    pub deleted: bool,
}

/// Implementation of the list_integrations tool.
pub async fn list_impl(db: &Db, params: ListIntegrationsParams) -> Result<CallToolResult, McpError> {
    let integrations = db.list_integrations(params.user_id).await?;
    json_result(&ListIntegrationsOutput { integrations })
}

/// Implementation of the save_integration tool.
pub async fn save_impl(db: &Db, params: SaveIntegrationParams) -> Result<CallToolResult, McpError> {
    let source = params.source.trim();
    if !supported_sources().contains(&source) {
        return Err(Error::UnknownSource(source.to_string()).into());
    }
    if params.token.trim().is_empty() {
        return Err(Error::InvalidInput("token cannot be empty".into()).into());
    }

    let location = match params.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(location) => location.to_string(),
        None => default_location(source)
            .ok_or_else(|| Error::InvalidInput(format!("no default location for {source}")))?
            .to_string(),
    };

    let data = serde_json::json!({ "token": params.token }).to_string();
    let integration_id = db.upsert_integration(params.user_id, source, &location, &data).await?;

    json_result(&SaveIntegrationOutput { integration_id, location })
}

/// Implementation of the delete_integration tool.
pub async fn delete_impl(db: &Db, params: DeleteIntegrationParams) -> Result<CallToolResult, McpError> {
    let deleted = db.delete_integration(params.integration_id).await?;
    json_result(&DeleteIntegrationOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;
    use blogsync_core::NewPost;

    fn save_params(location: Option<&str>) -> SaveIntegrationParams {
        SaveIntegrationParams {
            user_id: 1,
            source: "devto".into(),
            location: location.map(str::to_string),
            token: "devto-token".into(),
        }
    }

    #[tokio::test]
    async fn test_save_uses_default_location() {
        let db = Db::open_in_memory().await.unwrap();

        let output = output_json(&save_impl(&db, save_params(None)).await.unwrap());
        assert_eq!(output["location"], "https://dev.to/api/articles/me");

        let integration = db.get_integration(1, "devto").await.unwrap().unwrap();
        assert_eq!(integration.token().unwrap(), "devto-token");
    }

    #[tokio::test]
    async fn test_save_updates_existing() {
        let db = Db::open_in_memory().await.unwrap();

        let first = output_json(&save_impl(&db, save_params(None)).await.unwrap());
        let second = output_json(&save_impl(&db, save_params(Some("https://forem.example/api/articles/me"))).await.unwrap());

        assert_eq!(first["integration_id"], second["integration_id"]);
        let integration = db.get_integration(1, "devto").await.unwrap().unwrap();
        assert_eq!(integration.location, "https://forem.example/api/articles/me");
    }

    #[tokio::test]
    async fn test_save_rejects_unknown_source() {
        let db = Db::open_in_memory().await.unwrap();
        let params = SaveIntegrationParams { source: "medium".into(), ..save_params(None) };

        let err = save_impl(&db, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[tokio::test]
    async fn test_list_hides_token_and_shows_links() {
        let db = Db::open_in_memory().await.unwrap();
        let output = output_json(&save_impl(&db, save_params(None)).await.unwrap());
        let integration_id = output["integration_id"].as_i64().unwrap();

        let post_id = db
            .create_post(&NewPost {
                author_id: 1,
                slug: "a1".into(),
                title: "Hello".into(),
                category: "devlog".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        db.create_link(post_id, integration_id, "a1").await.unwrap();

        let output = output_json(&list_impl(&db, ListIntegrationsParams { user_id: 1 }).await.unwrap());
        let integrations = output["integrations"].as_array().unwrap();
        assert_eq!(integrations.len(), 1);
        assert_eq!(integrations[0]["source"], "devto");
        assert!(integrations[0].get("data").is_none());
        assert!(!output.to_string().contains("devto-token"));
        assert_eq!(integrations[0]["fetch_links"][0]["identifier"], "a1");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Db::open_in_memory().await.unwrap();
        let output = output_json(&save_impl(&db, save_params(None)).await.unwrap());
        let integration_id = output["integration_id"].as_i64().unwrap();

        let output = output_json(&delete_impl(&db, DeleteIntegrationParams { integration_id }).await.unwrap());
        assert_eq!(output["deleted"], true);

        let output = output_json(&delete_impl(&db, DeleteIntegrationParams { integration_id }).await.unwrap());
        assert_eq!(output["deleted"], false);
    }
}
