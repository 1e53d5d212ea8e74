//! fetch_projects tool implementation.
//!
//! Returns the user's devpad projects, from cache unless `force` is set.

use blogsync_client::{ProjectCacheEngine, ProjectSource};
use blogsync_core::{CacheStatus, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the fetch_projects tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchProjectsParams {
    /// Id of the user whose projects to return.
    pub user_id: i64,

    /// Skip the cache and fetch from devpad.
    #[serde(default)]
    pub force: bool,
}

/// Output from the fetch_projects tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FetchProjectsOutput {
    pub cache_id: i64,
    pub status: CacheStatus,
    pub source_url: String,
    pub fetched_at: String,
    /// Projects as returned by devpad.
    pub projects: Vec<serde_json::Value>,
}

/// Implementation of the fetch_projects tool.
pub async fn fetch_projects_impl<S: ProjectSource>(
    engine: &ProjectCacheEngine<S>, params: FetchProjectsParams,
) -> Result<CallToolResult, McpError> {
    let record = engine.fetch_projects(params.user_id, params.force).await?;
    let projects = record.projects().map_err(|err| match err {
        Error::Decode(msg) => Error::Decode(format!("{msg}; cached payload kept, call again with force=true to refetch")),
        other => other,
    })?;

    let output = FetchProjectsOutput {
        cache_id: record.id,
        status: record.status,
        source_url: record.source_url,
        fetched_at: record.fetched_at,
        projects,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;
    use async_trait::async_trait;
    use blogsync_client::ApiError;
    use blogsync_core::Db;
    use blogsync_core::store::credentials::DEVPAD_SOURCE;

    struct StaticProjects(Result<String, ApiError>);

    #[async_trait]
    impl ProjectSource for StaticProjects {
        fn projects_url(&self) -> &str {
            "https://devpad.example/api/v0/projects"
        }

        async fn fetch_projects(&self, _token: &str) -> Result<String, ApiError> {
            self.0.clone()
        }
    }

    async fn engine(response: Result<String, ApiError>) -> ProjectCacheEngine<StaticProjects> {
        let db = Db::open_in_memory().await.unwrap();
        db.set_credential(1, DEVPAD_SOURCE, "token").await.unwrap();
        ProjectCacheEngine::new(db, StaticProjects(response))
    }

    #[tokio::test]
    async fn test_fetch_projects_impl() {
        let engine = engine(Ok(r#"[{"name":"blog"},{"name":"devpad"}]"#.to_string())).await;

        let result = fetch_projects_impl(&engine, FetchProjectsParams { user_id: 1, force: false })
            .await
            .unwrap();
        let output = output_json(&result);
        assert_eq!(output["status"], "fetched");
        assert_eq!(output["projects"].as_array().unwrap().len(), 2);
        assert_eq!(output["projects"][0]["name"], "blog");
    }

    #[tokio::test]
    async fn test_fetch_projects_impl_upstream_error() {
        let engine = engine(Err(ApiError::HttpError { status: 500 })).await;

        let err = fetch_projects_impl(&engine, FetchProjectsParams { user_id: 1, force: true })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32004);
    }

    #[tokio::test]
    async fn test_fetch_projects_impl_missing_credential() {
        let engine = engine(Ok("[]".to_string())).await;

        let err = fetch_projects_impl(&engine, FetchProjectsParams { user_id: 2, force: false })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_fetch_projects_impl_undecodable_payload() {
        let engine = engine(Ok("<html>".to_string())).await;

        let err = fetch_projects_impl(&engine, FetchProjectsParams { user_id: 1, force: false })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32005);
        assert!(err.message.contains("force=true"));
    }
}
