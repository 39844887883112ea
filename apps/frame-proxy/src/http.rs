use std::sync::Arc;

use axum::{
    Router, debug_handler,
    extract::{DefaultBodyLimit, Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use frames_core::{
    ClassifiedOutcome, ForwardError, FrameActionProxy, InteractionQuery, InteractionRequest,
    ProxyError,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ProxyConfig;

#[derive(Clone)]
pub struct ProxyState {
    pub proxy: FrameActionProxy,
}

#[derive(Serialize, Debug)]
struct MessageBody<'a> {
    message: &'a str,
}

#[derive(Serialize, Debug)]
struct LocationBody<'a> {
    location: &'a str,
}

#[derive(Serialize, Debug)]
struct RawBody<'a> {
    body: &'a str,
}

/// HTTP rendering of a [`ClassifiedOutcome`].
#[derive(Debug)]
pub struct OutcomeResponse(pub ClassifiedOutcome);

impl IntoResponse for OutcomeResponse {
    fn into_response(self) -> Response {
        match &self.0 {
            // No Location header: the caller reads the target instead of the browser following it.
            ClassifiedOutcome::Redirect { location } => {
                (StatusCode::FOUND, Json(LocationBody { location })).into_response()
            }
            ClassifiedOutcome::UpstreamError { status, message } => {
                (*status, Json(MessageBody { message })).into_response()
            }
            ClassifiedOutcome::RawPassthrough { status, body } => {
                (*status, Json(RawBody { body })).into_response()
            }
            ClassifiedOutcome::Transaction(transaction) => Json(transaction).into_response(),
            ClassifiedOutcome::Action(action) => Json(action).into_response(),
            ClassifiedOutcome::Frame(result) => Json(result).into_response(),
        }
    }
}

/// HTTP rendering of a [`ProxyError`].
///
/// Only input and contract errors carry a body; every other failure is a bare status.
#[derive(Debug)]
pub struct ApiError(pub ProxyError);

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            ProxyError::InvalidSpecification(_) => (
                StatusCode::BAD_REQUEST,
                Json(MessageBody {
                    message: "Invalid specification",
                }),
            )
                .into_response(),
            err @ ProxyError::RedirectExpected { .. } => {
                let message = err.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    Json(MessageBody { message: &message }),
                )
                    .into_response()
            }
            ProxyError::MissingPostUrl
            | ProxyError::InvalidPostUrl(_)
            | ProxyError::InvalidPostType(_) => StatusCode::BAD_REQUEST.into_response(),
            ProxyError::InvalidFrameResponse(_) | ProxyError::MalformedBody(_) => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ProxyError::Forward(ForwardError::Timeout(_)) => {
                StatusCode::GATEWAY_TIMEOUT.into_response()
            }
            ProxyError::Forward(_) => StatusCode::BAD_GATEWAY.into_response(),
        }
    }
}

pub fn build_router(config: &ProxyConfig, proxy: FrameActionProxy) -> Router {
    let state = Arc::new(ProxyState { proxy });

    Router::new()
        .route(config.route.as_str(), post(proxy_action))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(Extension(state))
}

#[debug_handler]
async fn proxy_action(
    Extension(state): Extension<Arc<ProxyState>>,
    Query(query): Query<InteractionQuery>,
    Json(body): Json<Value>,
) -> Result<OutcomeResponse, ApiError> {
    handle_interaction(state, query, body).await
}

pub async fn handle_interaction(
    state: Arc<ProxyState>,
    query: InteractionQuery,
    body: Value,
) -> Result<OutcomeResponse, ApiError> {
    let request = InteractionRequest::from_query(query, body).map_err(|err| {
        debug!(error = %err, "rejected frame action request");
        err
    })?;
    let outcome = state.proxy.handle(request).await?;
    Ok(OutcomeResponse(outcome))
}
