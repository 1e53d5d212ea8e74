//! Upstream API client error types.

use std::sync::Arc;

use blogsync_core::Error;

/// Errors from the devpad and dev.to API clients.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// Endpoint URL is malformed or uses an unsupported scheme.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Request could not be constructed (bad header value, client setup).
    #[error("invalid request: {0}")]
    Request(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Non-200 response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Response body exceeded the configured limit.
    #[error("response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: u64, limit: usize },

    /// Response body could not be read.
    #[error("body read failed: {0}")]
    Body(String),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Network(Arc::new(err))
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidEndpoint(msg) | ApiError::Request(msg) => Error::UpstreamRequest(msg),
            ApiError::Timeout => Error::UpstreamTransport("request timeout".into()),
            ApiError::Network(e) => Error::UpstreamTransport(e.to_string()),
            ApiError::HttpError { status } => Error::UpstreamStatus { status },
            ApiError::TooLarge { .. } | ApiError::Body(_) => Error::UpstreamBody(err.to_string()),
            ApiError::Parse(msg) => Error::Decode(msg),
        }
    }
}
