use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::{Client, Response, redirect};
use tracing::debug;

use crate::{ForwardError, RawResponse, UpstreamClient, UpstreamRequest};

pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_UPSTREAM_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_UPSTREAM_TIMEOUT,
            user_agent: concat!("frames-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_UPSTREAM_BYTES,
        }
    }
}

/// reqwest-backed upstream client.
///
/// Holds two pooled clients because the redirect policy is fixed per `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestUpstreamClient {
    following: Client,
    manual: Client,
    timeout: Duration,
    max_body_bytes: usize,
}

impl ReqwestUpstreamClient {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, reqwest::Error> {
        let following = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        let manual = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            following,
            manual,
            timeout: settings.timeout,
            max_body_bytes: settings.max_body_bytes,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout(self.timeout)
        } else {
            ForwardError::Transport(err.without_url().to_string())
        }
    }

    fn map_body_error(&self, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout(self.timeout)
        } else {
            ForwardError::Body(err.without_url().to_string())
        }
    }

    /// Buffers the body chunk by chunk, giving up once it grows past the configured limit.
    async fn read_body(&self, mut response: Response) -> Result<BytesMut, ForwardError> {
        let limit = self.max_body_bytes;
        if response
            .content_length()
            .is_some_and(|length| length > limit as u64)
        {
            return Err(ForwardError::TooLarge { limit });
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| self.map_body_error(err))?
        {
            if body.len() + chunk.len() > limit {
                return Err(ForwardError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn post_json(&self, request: &UpstreamRequest) -> Result<RawResponse, ForwardError> {
        let client = if request.follow_redirects {
            &self.following
        } else {
            &self.manual
        };

        let response = client
            .post(request.url.clone())
            .json(&request.body)
            .send()
            .await
            .map_err(|err| self.map_send_error(err))?;

        let status = response.status();
        let headers = response.headers().clone();
        let redirected = response.url() != &request.url;
        let body = self.read_body(response).await?;
        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            redirected,
            "upstream response buffered"
        );

        Ok(RawResponse {
            status,
            headers,
            body: body.freeze(),
            redirected,
        })
    }
}
