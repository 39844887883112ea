use std::fmt;
use std::str::FromStr;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{ActionResponse, FrameParseResult, ProxyError};

/// Protocol dialect that governs how frame markup is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specification {
    #[default]
    Farcaster,
    #[serde(rename = "openframes")]
    OpenFrames,
}

impl Specification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Specification::Farcaster => "farcaster",
            Specification::OpenFrames => "openframes",
        }
    }

    /// Prefix shared by every meta property of this dialect.
    pub fn meta_prefix(&self) -> &'static str {
        match self {
            Specification::Farcaster => "fc:frame",
            Specification::OpenFrames => "of",
        }
    }

    /// Meta property carrying the frame version.
    pub fn version_property(&self) -> &'static str {
        match self {
            Specification::Farcaster => "fc:frame",
            Specification::OpenFrames => "of:version",
        }
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specification {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farcaster" => Ok(Specification::Farcaster),
            "openframes" => Ok(Specification::OpenFrames),
            other => Err(ProxyError::InvalidSpecification(other.to_string())),
        }
    }
}

/// Returns `true` when `value` names a supported dialect.
///
/// ```
/// use frames_core::is_specification_valid;
///
/// assert!(is_specification_valid("farcaster"));
/// assert!(is_specification_valid("openframes"));
/// assert!(!is_specification_valid("Farcaster"));
/// ```
pub fn is_specification_valid(value: &str) -> bool {
    value.parse::<Specification>().is_ok()
}

/// Semantics of the button that triggered the interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    #[default]
    Default,
    PostRedirect,
    Tx,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Default => "default",
            PostType::PostRedirect => "post_redirect",
            PostType::Tx => "tx",
        }
    }

    /// Redirect buttons must observe the 302 itself, so following is disabled for them.
    pub fn follows_redirects(&self) -> bool {
        !matches!(self, PostType::PostRedirect)
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(PostType::Default),
            "post_redirect" => Ok(PostType::PostRedirect),
            "tx" => Ok(PostType::Tx),
            other => Err(ProxyError::InvalidPostType(other.to_string())),
        }
    }
}

/// Raw query parameters of an inbound interaction, before validation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionQuery {
    pub post_url: Option<String>,
    pub post_type: Option<String>,
    pub specification: Option<String>,
}

/// A validated interaction, alive for a single proxy invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionRequest {
    pub post_url: Url,
    pub post_type: PostType,
    pub specification: Specification,
    /// Untrusted action payload, forwarded verbatim.
    pub body: Value,
}

impl InteractionRequest {
    /// Validates query parameters in gate order: specification, then `postUrl`, then `postType`.
    ///
    /// ```
    /// use frames_core::{InteractionQuery, InteractionRequest, PostType, Specification};
    /// use serde_json::json;
    ///
    /// let query = InteractionQuery {
    ///     post_url: Some("https://frame.example/api".into()),
    ///     ..Default::default()
    /// };
    /// let request = InteractionRequest::from_query(query, json!({})).unwrap();
    /// assert_eq!(request.post_type, PostType::Default);
    /// assert_eq!(request.specification, Specification::Farcaster);
    /// ```
    pub fn from_query(query: InteractionQuery, body: Value) -> Result<Self, ProxyError> {
        let specification = match query.specification.as_deref() {
            Some(raw) => raw.parse()?,
            None => Specification::default(),
        };

        let raw_url = query
            .post_url
            .filter(|value| !value.trim().is_empty())
            .ok_or(ProxyError::MissingPostUrl)?;
        let post_url = parse_http_url(raw_url.trim())
            .ok_or_else(|| ProxyError::InvalidPostUrl(raw_url.clone()))?;

        let post_type = match query.post_type.as_deref() {
            Some(raw) => raw.parse()?,
            None => PostType::default(),
        };

        Ok(Self {
            post_url,
            post_type,
            specification,
            body,
        })
    }

    /// URL of the frame the user interacted with, used to resolve relative frame URLs.
    ///
    /// Taken from `untrustedData.url` when it is an absolute http(s) URL, otherwise `postUrl`.
    pub fn frame_url(&self) -> Url {
        self.body
            .pointer("/untrustedData/url")
            .and_then(Value::as_str)
            .and_then(parse_http_url)
            .unwrap_or_else(|| self.post_url.clone())
    }
}

fn parse_http_url(raw: &str) -> Option<Url> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// The single normalized result of one proxy invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedOutcome {
    Redirect { location: String },
    UpstreamError { status: StatusCode, message: String },
    RawPassthrough { status: StatusCode, body: String },
    Transaction(Value),
    Action(ActionResponse),
    Frame(FrameParseResult),
}

impl ClassifiedOutcome {
    /// Stable label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedOutcome::Redirect { .. } => "redirect",
            ClassifiedOutcome::UpstreamError { .. } => "upstream_error",
            ClassifiedOutcome::RawPassthrough { .. } => "raw_passthrough",
            ClassifiedOutcome::Transaction(_) => "transaction",
            ClassifiedOutcome::Action(_) => "action",
            ClassifiedOutcome::Frame(_) => "frame",
        }
    }
}
