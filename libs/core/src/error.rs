use thiserror::Error;

use crate::{ForwardError, SchemaError};

/// Every way a proxy invocation can fail.
///
/// Input errors are raised before any network call. Nothing here is retried.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("postUrl query parameter is required")]
    MissingPostUrl,
    #[error("postUrl `{0}` is not an absolute http(s) URL")]
    InvalidPostUrl(String),
    #[error("invalid specification `{0}`")]
    InvalidSpecification(String),
    #[error("invalid postType `{0}`")]
    InvalidPostType(String),
    #[error("invalid response status code for post redirect button, 302 expected, got {status}")]
    RedirectExpected { status: u16 },
    #[error("invalid frame response")]
    InvalidFrameResponse(#[source] SchemaError),
    #[error("malformed upstream response body: {0}")]
    MalformedBody(String),
    #[error(transparent)]
    Forward(#[from] ForwardError),
}

impl ProxyError {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MissingPostUrl
            | ProxyError::InvalidPostUrl(_)
            | ProxyError::InvalidSpecification(_)
            | ProxyError::InvalidPostType(_) => "protocol_input",
            ProxyError::RedirectExpected { .. } => "contract_violation",
            ProxyError::InvalidFrameResponse(_) => "schema_validation",
            ProxyError::MalformedBody(_) | ProxyError::Forward(_) => "transport",
        }
    }
}
