use std::borrow::Cow;
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::types::{
    AcceptedProtocol, ButtonAction, Frame, FrameButton, FrameParseResult, ParseStatus, Report,
    ReportLevel, RequestMethod,
};
use crate::Specification;

pub const MAX_BUTTONS: usize = 4;
const MAX_INPUT_TEXT_CHARS: usize = 32;
const MAX_STATE_BYTES: usize = 4096;
const ASPECT_RATIOS: [&str; 2] = ["1.91:1", "1:1"];
const OPENFRAMES_ACCEPTS_PREFIX: &str = "of:accepts:";

static META_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("meta tag regex")
});
static NON_MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("non-markup regex")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)([a-z_:\-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("attribute regex")
});
static TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

/// Converts frame markup into a structured frame.
///
/// Extraction never fails outright: problems are reported per field and reflected in the
/// result status.
pub trait FrameExtractor: Send + Sync {
    fn extract(
        &self,
        html: &str,
        base_url: &Url,
        specification: Specification,
        method: RequestMethod,
    ) -> FrameParseResult;
}

/// Extractor that scans `<meta>` tags of the selected dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlFrameExtractor;

impl FrameExtractor for HtmlFrameExtractor {
    fn extract(
        &self,
        html: &str,
        base_url: &Url,
        specification: Specification,
        method: RequestMethod,
    ) -> FrameParseResult {
        let html = strip_non_markup(html);
        let tags = collect_meta_tags(&html);
        let mut extraction = Extraction {
            tags: &tags,
            base_url,
            specification,
            reports: BTreeMap::new(),
        };

        let mut frame = extraction.frame(method);
        frame.title = tags
            .get("og:title")
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .or_else(|| document_title(&html));

        let status = if extraction.has_errors() {
            ParseStatus::Failure
        } else {
            ParseStatus::Success
        };
        FrameParseResult {
            status,
            frame,
            reports: extraction.reports,
        }
    }
}

struct Extraction<'a> {
    tags: &'a BTreeMap<String, String>,
    base_url: &'a Url,
    specification: Specification,
    reports: BTreeMap<String, Vec<Report>>,
}

impl<'a> Extraction<'a> {
    fn frame(&mut self, method: RequestMethod) -> Frame {
        let og_image = self
            .get("og:image")
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| self.resolve("og:image", raw));
        let accepts = match self.specification {
            Specification::OpenFrames => self.accepts(),
            Specification::Farcaster => Vec::new(),
        };

        Frame {
            version: self.version(),
            image: self.image(og_image.as_deref()),
            image_aspect_ratio: self.aspect_ratio(),
            og_image,
            title: None,
            post_url: self.post_url(method),
            input_text: self.input_text(),
            state: self.state(),
            buttons: self.buttons(),
            accepts,
        }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}:{suffix}", self.specification.meta_prefix())
    }

    fn get(&self, property: &str) -> Option<&'a str> {
        let tags = self.tags;
        tags.get(property).map(String::as_str)
    }

    fn get_non_empty(&self, property: &str) -> Option<&'a str> {
        self.get(property)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn report(&mut self, property: &str, level: ReportLevel, message: impl Into<String>) {
        self.reports
            .entry(property.to_string())
            .or_default()
            .push(Report {
                level,
                message: message.into(),
                source: self.specification,
            });
    }

    fn error(&mut self, property: &str, message: impl Into<String>) {
        self.report(property, ReportLevel::Error, message);
    }

    fn warning(&mut self, property: &str, message: impl Into<String>) {
        self.report(property, ReportLevel::Warning, message);
    }

    fn has_errors(&self) -> bool {
        self.reports
            .values()
            .flatten()
            .any(|report| report.level == ReportLevel::Error)
    }

    fn resolve(&mut self, property: &str, raw: &str) -> Option<String> {
        match self.base_url.join(raw.trim()) {
            Ok(url) => Some(url.to_string()),
            Err(err) => {
                self.error(property, format!("invalid URL `{}`: {err}", raw.trim()));
                None
            }
        }
    }

    fn version(&mut self) -> Option<String> {
        let property = self.specification.version_property();
        let version = self.get_non_empty(property).map(str::to_string);
        if version.is_none() {
            self.error(property, "missing required frame version");
        }
        version
    }

    fn accepts(&mut self) -> Vec<AcceptedProtocol> {
        let tags = self.tags;
        let accepts: Vec<AcceptedProtocol> = tags
            .iter()
            .filter_map(|(property, version)| {
                property
                    .strip_prefix(OPENFRAMES_ACCEPTS_PREFIX)
                    .filter(|id| !id.is_empty())
                    .map(|id| AcceptedProtocol {
                        id: id.to_string(),
                        version: version.trim().to_string(),
                    })
            })
            .collect();
        if accepts.is_empty() {
            self.error(
                "of:accepts",
                "at least one of:accepts:<protocol> entry is required",
            );
        }
        accepts
    }

    fn image(&mut self, og_image: Option<&str>) -> Option<String> {
        let property = self.key("image");
        if let Some(raw) = self.get_non_empty(&property) {
            return self.resolve(&property, raw);
        }
        match og_image {
            Some(fallback) => {
                self.warning(&property, "missing frame image, falling back to og:image");
                Some(fallback.to_string())
            }
            None => {
                self.error(&property, "missing required frame image");
                None
            }
        }
    }

    fn aspect_ratio(&mut self) -> Option<String> {
        let property = self.key("image:aspect_ratio");
        let ratio = self.get_non_empty(&property)?;
        if ASPECT_RATIOS.contains(&ratio) {
            Some(ratio.to_string())
        } else {
            self.error(
                &property,
                format!("unsupported aspect ratio `{ratio}`, expected 1.91:1 or 1:1"),
            );
            None
        }
    }

    fn post_url(&mut self, method: RequestMethod) -> Option<String> {
        let property = self.key("post_url");
        if let Some(raw) = self.get_non_empty(&property) {
            return self.resolve(&property, raw);
        }
        let fallback = self.base_url.to_string();
        if method == RequestMethod::Post {
            self.warning(
                &property,
                format!("missing post_url, falling back to {fallback}"),
            );
        }
        Some(fallback)
    }

    fn input_text(&mut self) -> Option<String> {
        let property = self.key("input:text");
        let text = self.get_non_empty(&property)?;
        if text.chars().count() > MAX_INPUT_TEXT_CHARS {
            self.warning(
                &property,
                format!("input text is longer than {MAX_INPUT_TEXT_CHARS} characters"),
            );
        }
        Some(text.to_string())
    }

    fn state(&mut self) -> Option<String> {
        let property = self.key("state");
        let state = self.get(&property).filter(|value| !value.is_empty())?;
        if state.len() > MAX_STATE_BYTES {
            self.warning(
                &property,
                format!("state is larger than {MAX_STATE_BYTES} bytes"),
            );
        }
        Some(state.to_string())
    }

    fn buttons(&mut self) -> Vec<FrameButton> {
        let prefix = self.key("button:");
        let tags = self.tags;
        let mut indices: Vec<u8> = tags
            .keys()
            .filter_map(|property| property.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|rest| rest.parse().ok())
            .collect();
        indices.sort_unstable();
        indices.dedup();

        if indices.len() > MAX_BUTTONS {
            let property = self.key("button");
            self.error(
                &property,
                format!(
                    "at most {MAX_BUTTONS} buttons are allowed, found {}",
                    indices.len()
                ),
            );
        }

        let mut buttons = Vec::with_capacity(indices.len().min(MAX_BUTTONS));
        for (position, index) in indices.into_iter().enumerate() {
            let property = format!("{prefix}{index}");
            let expected = position + 1;
            if usize::from(index) != expected {
                self.error(
                    &property,
                    format!("button indices must be contiguous from 1, expected {expected}"),
                );
            }
            if usize::from(index) > MAX_BUTTONS {
                continue;
            }
            buttons.push(self.button(index, &property));
        }
        buttons
    }

    fn button(&mut self, index: u8, property: &str) -> FrameButton {
        let label = self.get(property).unwrap_or_default().trim().to_string();

        let action_property = format!("{property}:action");
        let action = match self.get_non_empty(&action_property) {
            Some(raw) => raw.parse().unwrap_or_else(|unknown| {
                self.error(
                    &action_property,
                    format!("unsupported button action `{unknown}`"),
                );
                ButtonAction::Post
            }),
            None => ButtonAction::Post,
        };

        let target_property = format!("{property}:target");
        let target = match self.get_non_empty(&target_property) {
            // mint targets are CAIP-10 asset ids, not URLs
            Some(raw) if action == ButtonAction::Mint => Some(raw.to_string()),
            Some(raw) => self.resolve(&target_property, raw),
            None => {
                if action.requires_target() {
                    self.error(
                        &target_property,
                        format!("button action `{}` requires a target", action.as_str()),
                    );
                }
                None
            }
        };

        let post_url_property = format!("{property}:post_url");
        let post_url = self
            .get_non_empty(&post_url_property)
            .and_then(|raw| self.resolve(&post_url_property, raw));

        FrameButton {
            index,
            label,
            action,
            target,
            post_url,
        }
    }
}

/// Drops comments, scripts and stylesheets so tags inside them are never read.
fn strip_non_markup(html: &str) -> Cow<'_, str> {
    NON_MARKUP.replace_all(html, " ")
}

fn collect_meta_tags(html: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    for tag in META_TAG.captures_iter(html) {
        let mut property = None;
        let mut content = None;
        for attribute in ATTRIBUTE.captures_iter(&tag[1]) {
            let value = attribute
                .get(2)
                .or_else(|| attribute.get(3))
                .or_else(|| attribute.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match attribute[1].to_ascii_lowercase().as_str() {
                "property" | "name" if property.is_none() => property = Some(value.to_string()),
                "content" => content = Some(decode_entities(value)),
                _ => {}
            }
        }
        if let (Some(property), Some(content)) = (property, content) {
            tags.entry(property).or_insert(content);
        }
    }
    tags
}

fn document_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|captures| decode_entities(captures[1].trim()))
        .filter(|title| !title.is_empty())
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
