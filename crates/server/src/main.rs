//! blog-sync server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use blogsync_client::{ArticleSyncEngine, DevToClient, DevpadClient, HttpClient, HttpConfig, ProjectCacheEngine};
use blogsync_core::{AppConfig, Db};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(db_path = %config.db_path.display(), "Starting blog-sync server on stdio transport");

    let db = Db::open(&config.db_path).await.context("failed to open database")?;
    let http = HttpClient::new(HttpConfig::from(&config))?;

    let projects = match config.devpad_api_url.as_deref() {
        Some(url) => Some(
            ProjectCacheEngine::new(db.clone(), DevpadClient::new(url, http.clone())?)
                .with_ttl(config.project_cache_ttl())
                .with_stale_pending_after(stale_pending_after(&config)),
        ),
        None => {
            tracing::warn!("devpad_api_url not set; fetch_projects is disabled");
            None
        }
    };
    let articles = ArticleSyncEngine::new(db.clone(), DevToClient::new(http)).with_category(config.sync_category.clone());

    let handler = handler::BlogSyncServer::new(handler::AppState { db, projects, articles });
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// A pending row older than twice the request deadline cannot belong to a
/// live fetch.
fn stale_pending_after(config: &AppConfig) -> chrono::Duration {
    chrono::Duration::milliseconds(2 * config.timeout_ms as i64)
}
