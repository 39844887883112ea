use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Specification;

/// HTTP method of the response the frame markup came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Warning,
}

/// A problem found while extracting one frame field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
    pub source: Specification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    #[default]
    Post,
    PostRedirect,
    Link,
    Mint,
    Tx,
}

impl ButtonAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonAction::Post => "post",
            ButtonAction::PostRedirect => "post_redirect",
            ButtonAction::Link => "link",
            ButtonAction::Mint => "mint",
            ButtonAction::Tx => "tx",
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, ButtonAction::Link | ButtonAction::Mint | ButtonAction::Tx)
    }
}

impl FromStr for ButtonAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ButtonAction::Post),
            "post_redirect" => Ok(ButtonAction::PostRedirect),
            "link" => Ok(ButtonAction::Link),
            "mint" => Ok(ButtonAction::Mint),
            "tx" => Ok(ButtonAction::Tx),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameButton {
    pub index: u8,
    pub label: String,
    pub action: ButtonAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedProtocol {
    pub id: String,
    pub version: String,
}

/// Frame fields recovered from markup. Every field is optional so partial frames survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<FrameButton>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepts: Vec<AcceptedProtocol>,
}

/// Extractor output: the (possibly partial) frame plus reports keyed by meta property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameParseResult {
    pub status: ParseStatus,
    pub frame: Frame,
    pub reports: BTreeMap<String, Vec<Report>>,
}

impl FrameParseResult {
    pub fn is_success(&self) -> bool {
        self.status == ParseStatus::Success
    }

    pub fn errors(&self) -> impl Iterator<Item = (&str, &Report)> {
        self.reports_at(ReportLevel::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &Report)> {
        self.reports_at(ReportLevel::Warning)
    }

    fn reports_at(&self, level: ReportLevel) -> impl Iterator<Item = (&str, &Report)> {
        self.reports.iter().flat_map(move |(field, reports)| {
            reports
                .iter()
                .filter(move |report| report.level == level)
                .map(move |report| (field.as_str(), report))
        })
    }
}
