//! Classification of a buffered upstream response into a [`ClassifiedOutcome`].
//!
//! Rules are evaluated in order and the first match wins:
//!
//! 1. `302` is a redirect, whatever the button type.
//! 2. `>= 500` passes the text body through as an upstream error.
//! 3. `400..=499` yields the structured error message, or the raw text if the body is unshaped.
//! 4. A redirect button that got anything else violates the upstream contract.
//! 5. Transaction buttons relay the JSON body untouched.
//! 6. JSON bodies must be a valid action response.
//! 7. Everything else is frame markup and goes to the extractor.

use http::StatusCode;
use http::header::{CONTENT_TYPE, LOCATION};
use serde_json::Value;

use crate::{
    ClassifiedOutcome, FrameExtractor, InteractionRequest, PostType, ProxyError, RawResponse,
    RequestMethod, parse_action_response, parse_error_body,
};

pub fn classify(
    request: &InteractionRequest,
    response: &RawResponse,
    extractor: &dyn FrameExtractor,
) -> Result<ClassifiedOutcome, ProxyError> {
    let status = response.status;

    if status == StatusCode::FOUND {
        let location = response
            .headers
            .get(LOCATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        return Ok(ClassifiedOutcome::Redirect { location });
    }

    if status.as_u16() >= 500 {
        return Ok(ClassifiedOutcome::UpstreamError {
            status,
            message: body_text(response)?,
        });
    }

    if status.is_client_error() {
        return Ok(match parse_error_body(&response.body) {
            Ok(message) => ClassifiedOutcome::UpstreamError { status, message },
            Err(_) => ClassifiedOutcome::RawPassthrough {
                status,
                body: body_text(response)?,
            },
        });
    }

    if request.post_type == PostType::PostRedirect {
        return Err(ProxyError::RedirectExpected {
            status: status.as_u16(),
        });
    }

    if request.post_type == PostType::Tx {
        let transaction: Value = serde_json::from_slice(&response.body)
            .map_err(|err| ProxyError::MalformedBody(err.to_string()))?;
        return Ok(ClassifiedOutcome::Transaction(transaction));
    }

    if is_json(response) {
        let value: Value = serde_json::from_slice(&response.body)
            .map_err(|err| ProxyError::MalformedBody(err.to_string()))?;
        let action = parse_action_response(value).map_err(ProxyError::InvalidFrameResponse)?;
        return Ok(ClassifiedOutcome::Action(action));
    }

    let html = body_text(response)?;
    // A followed redirect re-requests the landing page with GET.
    let method = if response.redirected {
        RequestMethod::Get
    } else {
        RequestMethod::Post
    };
    let frame = extractor.extract(&html, &request.frame_url(), request.specification, method);
    Ok(ClassifiedOutcome::Frame(frame))
}

fn is_json(response: &RawResponse) -> bool {
    response
        .header_str(CONTENT_TYPE)
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

fn body_text(response: &RawResponse) -> Result<String, ProxyError> {
    std::str::from_utf8(&response.body)
        .map(str::to_string)
        .map_err(|err| ProxyError::MalformedBody(err.to_string()))
}
