//! Errors raised by the server itself rather than the engines.

use blogsync_core::ConfigError;
use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Server-level failures reported to MCP clients.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A tool needs configuration that was not provided at startup.
    #[error("NOT_CONFIGURED: {0}")]
    NotConfigured(#[from] ConfigError),

    /// Tool output could not be serialized.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<ServerError> for McpError {
    fn from(err: ServerError) -> Self {
        let code = match &err {
            ServerError::NotConfigured(_) => -32001,
            ServerError::Serialize(_) => -32603,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_to_mcp_error() {
        let err = ServerError::from(ConfigError::Missing {
            field: "devpad_api_url".into(),
            hint: "Set BLOG_SYNC_DEVPAD_API_URL environment variable".into(),
        });
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32001);
        assert!(mcp_err.message.contains("BLOG_SYNC_DEVPAD_API_URL"));
    }
}
