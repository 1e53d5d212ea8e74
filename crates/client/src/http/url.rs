//! Endpoint URL parsing for upstream APIs.

use crate::ApiError;

/// Parse an API endpoint, accepting only absolute http(s) URLs.
///
/// Whitespace is trimmed and any fragment dropped. Unlike user-entered
/// page URLs, endpoints must carry their scheme.
pub fn parse_endpoint(input: &str) -> Result<url::Url, ApiError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(ApiError::InvalidEndpoint("empty URL".into()));
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| ApiError::InvalidEndpoint(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(ApiError::InvalidEndpoint(format!("unsupported scheme: {scheme}"))),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Append one path segment to a base URL, keeping the base path intact.
///
/// `https://host/api/v0` + `projects` gives `https://host/api/v0/projects`,
/// where `Url::join` would replace the last segment.
pub fn append_segment(base: &url::Url, segment: &str) -> Result<url::Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::InvalidEndpoint(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}
