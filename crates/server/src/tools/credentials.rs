//! set_credential tool implementation.
//!
//! Stores the API token used for project fetches.

use blogsync_core::Db;
use blogsync_core::store::credentials::DEVPAD_SOURCE;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Parameters for the set_credential tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SetCredentialParams {
    pub user_id: i64,

    /// Credential source (default: "devpad").
    #[serde(default = "default_source")]
    pub source: String,

    /// API token; replaces any stored token for the same source.
    pub token: String,
}

fn default_source() -> String {
    DEVPAD_SOURCE.into()
}

/// Output from the set_credential tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SetCredentialOutput {
    pub user_id: i64,
    pub source: String,
    pub stored: bool,
}

/// Implementation of the set_credential tool.
pub async fn set_impl(db: &Db, params: SetCredentialParams) -> Result<CallToolResult, McpError> {
    db.set_credential(params.user_id, &params.source, &params.token).await?;
    json_result(&SetCredentialOutput { user_id: params.user_id, source: params.source, stored: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::output_json;

    #[tokio::test]
    async fn test_set_credential() {
        let db = Db::open_in_memory().await.unwrap();
        let params: SetCredentialParams = serde_json::from_value(serde_json::json!({"user_id": 1, "token": "k"})).unwrap();

        let output = output_json(&set_impl(&db, params).await.unwrap());
        assert_eq!(output["source"], "devpad");
        assert_eq!(output["stored"], true);
        assert!(output.get("token").is_none());
        assert_eq!(db.get_credential(1, DEVPAD_SOURCE).await.unwrap().as_deref(), Some("k"));
    }

    #[tokio::test]
    async fn test_set_credential_rejects_empty_token() {
        let db = Db::open_in_memory().await.unwrap();
        let params = SetCredentialParams { user_id: 1, source: "devpad".into(), token: " ".into() };

        let err = set_impl(&db, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
