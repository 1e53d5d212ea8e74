//! dev.to (Forem) articles API client.
//!
//! - **Endpoint**: the integration's `location`, by default
//!   `https://dev.to/api/articles/me`
//! - **Authentication**: `api-key: <token>`
//! - **Media type**: `Accept: application/vnd.forem.api-v1+json`
//! - **Response**: JSON list of the user's published articles
//!
//! Only the first page is requested.

mod article;

pub use article::ExternalArticle;

use async_trait::async_trait;
use reqwest::header::{self, HeaderName, HeaderValue};

use blogsync_core::AppConfig;
use blogsync_core::store::integrations::DEVTO_SOURCE;

use crate::http::{HttpClient, HttpConfig, parse_endpoint, secret_header};
use crate::{ApiError, ArticleSource};

/// Versioned media type the Forem API expects.
pub const FOREM_MEDIA_TYPE: &str = "application/vnd.forem.api-v1+json";

const API_KEY_HEADER: HeaderName = HeaderName::from_static("api-key");

/// dev.to API client.
#[derive(Debug, Clone)]
pub struct DevToClient {
    http: HttpClient,
}

impl DevToClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self::new(HttpClient::new(HttpConfig::from(config))?))
    }
}

#[async_trait]
impl ArticleSource for DevToClient {
    fn name(&self) -> &'static str {
        DEVTO_SOURCE
    }

    async fn fetch_articles(&self, location: &str, token: &str) -> Result<Vec<ExternalArticle>, ApiError> {
        let url = parse_endpoint(location)?;
        let headers = vec![
            (API_KEY_HEADER, secret_header(token)?),
            (header::ACCEPT, HeaderValue::from_static(FOREM_MEDIA_TYPE)),
        ];

        tracing::debug!(url = %url, "fetching dev.to articles");

        let bytes = self.http.get(&url, headers).await?;
        let articles: Vec<serde_json::Value> =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(format!("article list: {e}")))?;

        tracing::debug!(url = %url, count = articles.len(), "decoded dev.to article list");

        Ok(articles.into_iter().map(ExternalArticle::from).collect())
    }
}
