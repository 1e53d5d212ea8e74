//! devpad projects API client.
//!
//! - **Endpoint**: `{base}/projects`
//! - **Authentication**: `Authorization: Bearer <token>`
//! - **Response**: JSON list of projects, stored verbatim in the project cache.

use async_trait::async_trait;
use reqwest::header;

use blogsync_core::AppConfig;

use crate::http::{HttpClient, HttpConfig, append_segment, parse_endpoint, secret_header};
use crate::{ApiError, ProjectSource};

/// devpad API client.
#[derive(Debug, Clone)]
pub struct DevpadClient {
    http: HttpClient,
    projects_url: String,
}

impl DevpadClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str, http: HttpClient) -> Result<Self, ApiError> {
        let base = parse_endpoint(base_url)?;
        let projects_url = append_segment(&base, "projects")?.to_string();
        Ok(Self { http, projects_url })
    }

    /// Create a client from application configuration.
    ///
    /// Fails if `devpad_api_url` is not configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let base_url = config
            .require_devpad_api_url()
            .map_err(|e| ApiError::InvalidEndpoint(e.to_string()))?;
        Self::new(base_url, HttpClient::new(HttpConfig::from(config))?)
    }
}

#[async_trait]
impl ProjectSource for DevpadClient {
    fn projects_url(&self) -> &str {
        &self.projects_url
    }

    async fn fetch_projects(&self, token: &str) -> Result<String, ApiError> {
        let url = parse_endpoint(&self.projects_url)?;
        let headers = vec![
            (header::AUTHORIZATION, secret_header(&format!("Bearer {token}"))?),
            (header::ACCEPT, header::HeaderValue::from_static("application/json")),
        ];

        tracing::debug!(url = %url, "fetching devpad projects");

        let bytes = self.http.get(&url, headers).await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ApiError::Body(format!("projects body is not UTF-8: {e}")))
    }
}
