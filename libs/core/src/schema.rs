//! Shape validators for structured upstream bodies.
//!
//! Action responses are a closed set keyed by their `type` tag. Error bodies carry a single
//! non-empty `message`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("body does not match any known shape")]
    Shape(#[source] serde_json::Error),
    #[error("`{field}` must be a non-empty string")]
    Empty { field: &'static str },
    #[error("`{field}` must be a valid URL")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Client-side effect requested by an action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionResponse {
    Message {
        message: String,
    },
    Frame {
        #[serde(rename = "frameUrl")]
        frame_url: String,
    },
    Form {
        url: String,
        title: String,
    },
}

impl ActionResponse {
    pub fn validate(&self) -> Result<(), SchemaError> {
        match self {
            ActionResponse::Message { message } => non_empty("message", message),
            ActionResponse::Frame { frame_url } => valid_url("frameUrl", frame_url),
            ActionResponse::Form { url, title } => {
                valid_url("url", url)?;
                non_empty("title", title)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Validates a parsed JSON body against the action response set.
///
/// Objects without a `type` tag are treated as messages; no other implicit tag exists.
///
/// ```
/// use frames_core::{parse_action_response, ActionResponse};
/// use serde_json::json;
///
/// let action = parse_action_response(json!({"message": "hi"})).unwrap();
/// assert_eq!(action, ActionResponse::Message { message: "hi".into() });
/// ```
pub fn parse_action_response(mut value: Value) -> Result<ActionResponse, SchemaError> {
    if let Value::Object(map) = &mut value {
        if !map.contains_key("type") {
            map.insert("type".into(), Value::String("message".into()));
        }
    }
    let action: ActionResponse = serde_json::from_value(value).map_err(SchemaError::Shape)?;
    action.validate()?;
    Ok(action)
}

/// Extracts the message of a structured upstream error body.
pub fn parse_error_body(body: &[u8]) -> Result<String, SchemaError> {
    let parsed: ErrorBody = serde_json::from_slice(body).map_err(SchemaError::Shape)?;
    non_empty("message", &parsed.message)?;
    Ok(parsed.message)
}

fn non_empty(field: &'static str, value: &str) -> Result<(), SchemaError> {
    if value.is_empty() {
        return Err(SchemaError::Empty { field });
    }
    Ok(())
}

fn valid_url(field: &'static str, value: &str) -> Result<(), SchemaError> {
    non_empty(field, value)?;
    Url::parse(value).map_err(|source| SchemaError::InvalidUrl { field, source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn untagged_object_becomes_message() {
        let action = parse_action_response(json!({"message": "done"})).unwrap();
        assert_eq!(
            action,
            ActionResponse::Message {
                message: "done".into()
            }
        );
    }

    #[test]
    fn shim_does_not_override_existing_tag() {
        let action =
            parse_action_response(json!({"type": "frame", "frameUrl": "https://f.example/next"}))
                .unwrap();
        assert_eq!(
            action,
            ActionResponse::Frame {
                frame_url: "https://f.example/next".into()
            }
        );
    }

    #[test]
    fn frame_url_must_be_a_url() {
        let err = parse_action_response(json!({"type": "frame", "frameUrl": "not-a-url"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidUrl { field: "frameUrl", .. }));
    }

    #[test]
    fn form_requires_url_and_title() {
        let ok = parse_action_response(json!({
            "type": "form",
            "url": "https://f.example/form",
            "title": "Sign up"
        }))
        .unwrap();
        assert!(matches!(ok, ActionResponse::Form { .. }));

        let err = parse_action_response(json!({
            "type": "form",
            "url": "https://f.example/form",
            "title": ""
        }))
        .unwrap_err();
        assert!(matches!(err, SchemaError::Empty { field: "title" }));

        let err = parse_action_response(json!({"type": "form", "url": "nope", "title": "x"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidUrl { field: "url", .. }));
    }

    #[test]
    fn unknown_tag_and_empty_message_fail() {
        assert!(matches!(
            parse_action_response(json!({"type": "video", "message": "x"})),
            Err(SchemaError::Shape(_))
        ));
        assert!(matches!(
            parse_action_response(json!({"message": ""})),
            Err(SchemaError::Empty { field: "message" })
        ));
        assert!(matches!(
            parse_action_response(json!({})),
            Err(SchemaError::Shape(_))
        ));
        assert!(matches!(
            parse_action_response(json!(["message"])),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn serializes_with_wire_names() {
        let value = serde_json::to_value(ActionResponse::Frame {
            frame_url: "https://f.example".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "frame", "frameUrl": "https://f.example"}));
    }

    #[test]
    fn error_body_requires_message() {
        assert_eq!(parse_error_body(br#"{"message":"nope"}"#).unwrap(), "nope");
        assert!(parse_error_body(br#"{"message":""}"#).is_err());
        assert!(parse_error_body(br#"{"error":"nope"}"#).is_err());
        assert!(parse_error_body(b"oops").is_err());
    }
}
