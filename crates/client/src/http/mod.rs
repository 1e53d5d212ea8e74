//! Shared HTTP plumbing for the upstream API clients.
//!
//! ### Limits
//! - Every request carries an explicit deadline (default 20s).
//! - Bodies larger than `max_bytes` (default 5MB) are rejected, first by
//!   `Content-Length` and again after reading.
//! - Anything but `200 OK` is an error; redirects are followed by reqwest.

pub mod url;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};

use blogsync_core::AppConfig;

pub use self::url::{append_segment, parse_endpoint};

use crate::ApiError;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User agent string (default: "blog-sync/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request deadline (default: 20s)
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { user_agent: "blog-sync/0.1".to_string(), max_bytes: 5 * 1024 * 1024, timeout: Duration::from_millis(20000) }
    }
}

impl From<&AppConfig> for HttpConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), max_bytes: config.max_bytes, timeout: config.timeout() }
    }
}

/// Build a header value that must not show up in debug output.
pub fn secret_header(value: &str) -> Result<HeaderValue, ApiError> {
    let mut value =
        HeaderValue::from_str(value).map_err(|_| ApiError::Request("credential contains invalid characters".into()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Thin reqwest wrapper applying the deadline and body limits.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Create a new client with the given configuration.
    pub fn new(config: HttpConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| ApiError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// GET `url` with the given headers and return the full body.
    pub async fn get(&self, url: &reqwest::Url, headers: Vec<(HeaderName, HeaderValue)>) -> Result<Bytes, ApiError> {
        let start = Instant::now();

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            header_map.insert(name, value);
        }

        let response = self.http.get(url.clone()).headers(header_map).send().await?;

        let status = response.status();
        tracing::debug!(url = %url, status = status.as_u16(), "upstream response");

        if status != StatusCode::OK {
            return Err(ApiError::HttpError { status: status.as_u16() });
        }

        if let Some(len) = response.content_length()
            && len > self.config.max_bytes as u64
        {
            return Err(ApiError::TooLarge { size: len, limit: self.config.max_bytes });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| ApiError::Body(e.to_string()))?;

        if bytes.len() > self.config.max_bytes {
            return Err(ApiError::TooLarge { size: bytes.len() as u64, limit: self.config.max_bytes });
        }

        tracing::debug!(
            url = %url,
            content_type = content_type.as_deref().unwrap_or(""),
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upstream body read"
        );

        Ok(bytes)
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}
