//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.

use std::sync::Arc;

use blogsync_client::{ArticleSyncEngine, DevToClient, DevpadClient, ProjectCacheEngine};
use blogsync_core::{ConfigError, Db};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::error::ServerError;
use crate::tools::articles::{SyncArticlesParams, sync_articles_impl};
use crate::tools::credentials::{SetCredentialParams, set_impl};
use crate::tools::integrations::{
    DeleteIntegrationParams, ListIntegrationsParams, SaveIntegrationParams, delete_impl, list_impl, save_impl,
};
use crate::tools::projects::{FetchProjectsParams, fetch_projects_impl};

/// Shared state behind every tool call.
pub struct AppState {
    pub db: Db,
    /// Absent when no devpad API URL is configured.
    pub projects: Option<ProjectCacheEngine<DevpadClient>>,
    pub articles: ArticleSyncEngine<DevToClient>,
}

/// The main MCP server handler for blog-sync.
#[derive(Clone)]
pub struct BlogSyncServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl BlogSyncServer {
    /// Create a new server handler.
    pub fn new(state: AppState) -> Self {
        Self { state: Arc::new(state), tool_router: Self::tool_router() }
    }

    fn projects_engine(&self) -> Result<&ProjectCacheEngine<DevpadClient>, McpError> {
        self.state.projects.as_ref().ok_or_else(|| {
            ServerError::from(ConfigError::Missing {
                field: "devpad_api_url".into(),
                hint: "Set BLOG_SYNC_DEVPAD_API_URL environment variable".into(),
            })
            .into()
        })
    }

    /// Return a user's devpad projects.
    ///
    /// Serves the latest fetched cache row unless `force` is set, in which
    /// case devpad is always called and a new cache row recorded.
    #[tool(
        description = "Get a user's devpad projects. Uses the cached copy unless force=true; failed fetches are recorded and returned as errors."
    )]
    async fn fetch_projects(&self, params: Parameters<FetchProjectsParams>) -> Result<CallToolResult, McpError> {
        fetch_projects_impl(self.projects_engine()?, params.0).await
    }

    /// Import a user's articles from a connected source as posts.
    #[tool(
        description = "Import a user's articles from a connected source (devto) as blog posts. Already imported articles are skipped; returns per-run counts."
    )]
    async fn sync_articles(&self, params: Parameters<SyncArticlesParams>) -> Result<CallToolResult, McpError> {
        sync_articles_impl(&self.state.articles, params.0).await
    }

    #[tool(description = "List a user's article source integrations with the articles imported through each.")]
    async fn list_integrations(&self, params: Parameters<ListIntegrationsParams>) -> Result<CallToolResult, McpError> {
        list_impl(&self.state.db, params.0).await
    }

    #[tool(description = "Connect or update an article source for a user. Location defaults to the source's standard endpoint.")]
    async fn save_integration(&self, params: Parameters<SaveIntegrationParams>) -> Result<CallToolResult, McpError> {
        save_impl(&self.state.db, params.0).await
    }

    #[tool(description = "Delete an integration and the fetch links created through it. Imported posts are kept.")]
    async fn delete_integration(
        &self, params: Parameters<DeleteIntegrationParams>,
    ) -> Result<CallToolResult, McpError> {
        delete_impl(&self.state.db, params.0).await
    }

    #[tool(description = "Store a user's API token for a source (default: devpad), replacing any previous token.")]
    async fn set_credential(&self, params: Parameters<SetCredentialParams>) -> Result<CallToolResult, McpError> {
        set_impl(&self.state.db, params.0).await
    }
}

impl ServerHandler for BlogSyncServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "blog-sync".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
