//! Structured frame representation and the HTML metadata extractor.
mod extract;
mod types;

pub use extract::{FrameExtractor, HtmlFrameExtractor, MAX_BUTTONS};
pub use types::*;
