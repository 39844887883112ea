use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{Instrument, debug, info, warn};

use crate::{
    ClassifiedOutcome, FrameExtractor, InteractionRequest, ProxyError, UpstreamClient,
    UpstreamRequest, classify,
};

/// Forwards one interaction upstream and classifies the reply.
///
/// Holds no per-call state, so a single instance is shared by every request handler.
#[derive(Clone)]
pub struct FrameActionProxy {
    upstream: Arc<dyn UpstreamClient>,
    extractor: Arc<dyn FrameExtractor>,
}

impl FrameActionProxy {
    pub fn new(upstream: Arc<dyn UpstreamClient>, extractor: Arc<dyn FrameExtractor>) -> Self {
        Self {
            upstream,
            extractor,
        }
    }

    pub async fn handle(
        &self,
        request: InteractionRequest,
    ) -> Result<ClassifiedOutcome, ProxyError> {
        let span = tracing::info_span!(
            "frame_action",
            post_type = %request.post_type,
            specification = %request.specification,
            upstream_host = request.post_url.host_str().unwrap_or("")
        );
        async move {
            counter!(
                "frame_proxy_requests_total",
                "post_type" => request.post_type.as_str(),
                "specification" => request.specification.as_str()
            )
            .increment(1);

            let upstream_request = UpstreamRequest {
                url: request.post_url.clone(),
                body: request.body.clone(),
                follow_redirects: request.post_type.follows_redirects(),
            };

            let started = Instant::now();
            let response = match self.upstream.post_json(&upstream_request).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(error = %err, "upstream call failed");
                    let err = ProxyError::from(err);
                    record_failure(&err);
                    return Err(err);
                }
            };
            histogram!(
                "frame_proxy_upstream_seconds",
                "status" => response.status.as_str().to_string()
            )
            .record(started.elapsed().as_secs_f64());

            match classify(&request, &response, self.extractor.as_ref()) {
                Ok(outcome) => {
                    if let ClassifiedOutcome::Frame(result) = &outcome {
                        if !result.is_success() {
                            debug!(
                                errors = result.errors().count(),
                                "upstream frame markup has errors"
                            );
                        }
                    }
                    info!(
                        outcome = outcome.kind(),
                        status = response.status.as_u16(),
                        "frame action classified"
                    );
                    counter!("frame_proxy_outcomes_total", "outcome" => outcome.kind())
                        .increment(1);
                    Ok(outcome)
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        status = response.status.as_u16(),
                        "frame action rejected"
                    );
                    record_failure(&err);
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn record_failure(err: &ProxyError) {
    counter!("frame_proxy_failures_total", "kind" => err.kind()).increment(1);
}
