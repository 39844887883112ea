use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// A fully buffered upstream response.
///
/// The body is read once; classification parses it as many times as it needs.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Set when the client followed at least one redirect to reach this response.
    pub redirected: bool,
}

impl RawResponse {
    pub fn header_str(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// The single outbound POST of an interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub url: Url,
    pub body: Value,
    pub follow_redirects: bool,
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("upstream request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("failed to read upstream response body: {0}")]
    Body(String),
    #[error("upstream response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Performs the outbound call to a third-party frame server.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn post_json(&self, request: &UpstreamRequest) -> Result<RawResponse, ForwardError>;
}
