//! Unified error types for blog-sync.
//!
//! Every variant renders with a stable code prefix so callers can match on
//! the message without depending on the enum.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the sync engines and stores.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty source name).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No API credential stored for the user and source.
    #[error("CREDENTIAL_MISSING: no {source_name} credential for user {user_id}")]
    CredentialMissing { user_id: i64, source_name: String },

    /// No integration configured for the user and source.
    #[error("INTEGRATION_NOT_FOUND: no {source_name} integration configured for user {user_id}")]
    IntegrationNotFound { user_id: i64, source_name: String },

    /// The integration's configuration blob is malformed or lacks a token.
    #[error("INTEGRATION_DATA: {0}")]
    IntegrationData(String),

    /// The source name is not one this service can sync.
    #[error("UNKNOWN_SOURCE: {0}")]
    UnknownSource(String),

    /// The outbound request could not be built.
    #[error("UPSTREAM_REQUEST: {0}")]
    UpstreamRequest(String),

    /// Network failure or timeout talking to the upstream API.
    #[error("UPSTREAM_TRANSPORT: {0}")]
    UpstreamTransport(String),

    /// Upstream answered with a non-200 status.
    #[error("UPSTREAM_STATUS: {status}")]
    UpstreamStatus { status: u16 },

    /// Upstream body could not be read in full.
    #[error("UPSTREAM_BODY: {0}")]
    UpstreamBody(String),

    /// Upstream payload or one of its items did not match the expected shape.
    #[error("DECODE_ERROR: {0}")]
    Decode(String),

    /// A fetch link already exists for this (source, identifier).
    #[error("DUPLICATE_LINK: {identifier} already linked for integration {integration_id}")]
    DuplicateLink { integration_id: i64, identifier: String },

    /// The author already has a post with this slug.
    #[error("SLUG_TAKEN: user {author_id} already has a post with slug {slug}")]
    SlugTaken { author_id: i64, slug: String },

    /// Another project fetch for the same user is still pending.
    #[error("FETCH_IN_FLIGHT: a project fetch is already pending for user {0}")]
    FetchInFlight(i64),

    /// A row the caller expected to exist is absent.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl Error {
    /// Errors that leave the cache untouched because they are raised before
    /// a pending row exists.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::CredentialMissing { .. }
                | Error::IntegrationNotFound { .. }
                | Error::IntegrationData(_)
                | Error::UnknownSource(_)
        )
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) | Error::UnknownSource(_) => -32602,
            Error::CredentialMissing { .. } | Error::IntegrationNotFound { .. } | Error::IntegrationData(_) => -32001,
            Error::UpstreamRequest(_) | Error::UpstreamTransport(_) | Error::UpstreamBody(_) => -32003,
            Error::UpstreamStatus { .. } => -32004,
            Error::Decode(_) => -32005,
            Error::DuplicateLink { .. } | Error::SlugTaken { .. } | Error::FetchInFlight(_) => -32006,
            Error::NotFound(_) => -32007,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
