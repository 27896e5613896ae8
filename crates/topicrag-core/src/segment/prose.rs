use regex::Regex;
use std::sync::LazyLock;

use super::window::split_windows;
use crate::config::SegmentSettings;

// two or more newlines, blank lines may carry stray spaces or tabs
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\r?\n[ \t]*){2,}").expect("blank-line pattern")
});

/// Split text into trimmed, non-empty paragraphs in document order.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    BLANK_LINES
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Paragraph segmentation with oversized paragraphs re-split into windows.
pub fn segment_prose(text: &str, cfg: &SegmentSettings) -> Vec<String> {
    let mut out = Vec::new();
    for paragraph in split_paragraphs(text) {
        if paragraph.chars().count() <= cfg.max_paragraph_chars {
            out.push(paragraph.to_string());
        } else {
            out.extend(
                split_windows(paragraph, cfg.chunk_size, cfg.overlap)
                    .into_iter()
                    .map(|w| w.trim().to_string()),
            );
        }
    }
    out
}
