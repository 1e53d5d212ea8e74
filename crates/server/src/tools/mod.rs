//! MCP tool implementations.
//!
//! This module contains all tools exposed by the blog-sync server. Each
//! `*_impl` function takes the state it needs explicitly so it can be tested
//! without a running server.

pub mod articles;
pub mod credentials;
pub mod integrations;
pub mod projects;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ServerError;

/// Render a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ServerError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
